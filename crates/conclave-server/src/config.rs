use std::net::SocketAddr;
use std::path::PathBuf;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("CONCLAVE_JWT_SECRET is unset or still a placeholder")]
    MissingSecret,
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub realtime_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub public_url: String,
    pub mail_relay_url: Option<String>,
    pub mail_from: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads every setting through `lookup`; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let jwt_secret = get("CONCLAVE_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            return Err(ConfigError::MissingSecret);
        }
        let realtime_secret = get("CONCLAVE_REALTIME_SECRET").unwrap_or_else(|| jwt_secret.clone());

        let host = get("CONCLAVE_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = get("CONCLAVE_PORT").unwrap_or_else(|| "3000".into());
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .map_err(|_| ConfigError::Invalid {
                name: "CONCLAVE_HOST/CONCLAVE_PORT",
                value: format!("{}:{}", host, port),
            })?;

        let public_url = get("CONCLAVE_PUBLIC_URL")
            .unwrap_or_else(|| "http://localhost:3000".into())
            .trim_end_matches('/')
            .to_string();
        if !public_url.starts_with("http://") && !public_url.starts_with("https://") {
            return Err(ConfigError::Invalid { name: "CONCLAVE_PUBLIC_URL", value: public_url });
        }

        Ok(Self {
            jwt_secret,
            realtime_secret,
            db_path: get("CONCLAVE_DB_PATH").unwrap_or_else(|| "conclave.db".into()).into(),
            addr,
            public_url,
            mail_relay_url: get("CONCLAVE_MAIL_RELAY_URL"),
            mail_from: get("CONCLAVE_MAIL_FROM").unwrap_or_else(|| "no-reply@conclave.local".into()),
        })
    }
}
