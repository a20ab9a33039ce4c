mod config;

use std::sync::Arc;

use tracing::info;

use conclave_api::auth::{AppState, AppStateInner};
use conclave_api::notify::{MailRelayNotifier, Notifier};
use conclave_api::tokens::JwtTokens;
use conclave_core::ChatService;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "conclave=debug,tower_http=debug".into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {}.", e);
            eprintln!("       Set it in your .env file and restart.");
            std::process::exit(1);
        }
    };

    let db = conclave_db::Database::open(&config.db_path)?;
    info!("Database ready at {}", config.db_path.display());

    let notifier = match &config.mail_relay_url {
        Some(url) => {
            info!("Invitations delivered through mail relay {}", url);
            Notifier::MailRelay(MailRelayNotifier::new(url.clone(), config.mail_from.clone()))
        }
        None => {
            info!("No mail relay configured, invitations will be logged");
            Notifier::Log
        }
    };

    let state: AppState = Arc::new(AppStateInner {
        chat: ChatService::new(db, config.public_url.clone()),
        tokens: JwtTokens::new(config.jwt_secret.clone(), config.realtime_secret.clone()),
        notifier,
    });

    let app = conclave_api::router(state);

    info!("Conclave server listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(_) => {
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
