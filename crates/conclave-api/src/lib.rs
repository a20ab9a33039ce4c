pub mod auth;
pub mod error;
pub mod groups;
pub mod me;
pub mod membership;
pub mod middleware;
pub mod notify;
pub mod tokens;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use conclave_core::{ChatResult, ChatService};
use conclave_db::Database;

use crate::auth::{AppState, AppStateInner};
use crate::error::{ApiError, ApiResult};

/// Builds the full HTTP surface over `state`.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route(
            "/invitations/accept",
            get(membership::accept_invitation_link).post(membership::accept_invitation),
        );

    let protected_routes = Router::new()
        .route("/groups", post(groups::create_group).get(groups::list_groups))
        .route("/groups/search", get(groups::search_groups))
        .route("/groups/{group_id}", delete(groups::delete_group))
        .route("/groups/{group_id}/channels", post(groups::create_channel))
        .route("/channels/{channel_id}/join", post(membership::join_channel))
        .route("/channels/{channel_id}/invitations", post(membership::invite))
        .route("/channels/{channel_id}/membership", delete(membership::leave_channel))
        .route(
            "/channels/{channel_id}/members/{user_id}/access",
            put(membership::set_access),
        )
        .route("/me/capabilities", get(me::capabilities))
        .route("/me/groups", get(me::grouped_channels))
        .route("/me/channels", get(me::channels))
        .route("/me/realtime-token", get(me::realtime_token))
        .layer(axum_middleware::from_fn_with_state(state.clone(), middleware::require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Runs a store-bound chat operation off the async runtime.
pub(crate) async fn run_blocking<T, F>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&ChatService<Database>) -> ChatResult<T> + Send + 'static,
    T: Send + 'static,
{
    run_blocking_with(state, move |inner| f(&inner.chat)).await
}

/// Like [`run_blocking`] for work that also needs the token signer.
pub(crate) async fn run_blocking_with<T, F>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&AppStateInner) -> ChatResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("worker task failed"))
        })?
        .map_err(ApiError::from)
}
