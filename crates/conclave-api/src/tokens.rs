use std::collections::HashMap;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use conclave_core::notify::TokenIssuer;
use conclave_types::api::{ActionClaims, Claims, RealtimeClaims, TokenAction};
use conclave_types::models::Capabilities;

const SESSION_TTL_DAYS: i64 = 30;
const ACTION_TTL_DAYS: i64 = 7;
const REALTIME_TTL_MINUTES: i64 = 60;

/// HS256 signer for session, action and realtime tokens.
pub struct JwtTokens {
    secret: String,
    realtime_secret: String,
}

impl JwtTokens {
    pub fn new(secret: impl Into<String>, realtime_secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            realtime_secret: realtime_secret.into(),
        }
    }

    pub fn session_token(&self, user_id: Uuid, username: &str) -> Result<String> {
        let claims = Claims {
            sub: user_id,
            username: username.to_string(),
            exp: expiry(Duration::days(SESSION_TTL_DAYS)),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;

        Ok(token)
    }

    pub fn verify_session(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(data.claims)
    }

    /// Checks signature, expiry and that the token was issued for `expected`.
    pub fn verify_action(&self, token: &str, expected: TokenAction) -> Result<ActionClaims> {
        let data = decode::<ActionClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )?;
        if data.claims.action != expected {
            return Err(anyhow!("token is for {:?}, not {:?}", data.claims.action, expected));
        }
        Ok(data.claims)
    }

    /// Signs `capabilities` for the pub/sub backend.
    pub fn realtime_token(&self, user_id: Uuid, capabilities: &Capabilities) -> Result<(String, DateTime<Utc>)> {
        let now = Utc::now();
        let expires_at = now + Duration::minutes(REALTIME_TTL_MINUTES);
        let claims = RealtimeClaims {
            sub: user_id,
            capability: serde_json::to_string(capabilities)?,
            iat: now.timestamp() as usize,
            exp: expires_at.timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.realtime_secret.as_bytes()),
        )?;

        Ok((token, expires_at))
    }
}

impl TokenIssuer for JwtTokens {
    fn issue(&self, actor: Uuid, action: TokenAction, claims: HashMap<String, String>) -> Result<String> {
        let claims = ActionClaims {
            sub: actor,
            action,
            exp: expiry(Duration::days(ACTION_TTL_DAYS)),
            extra: claims,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;

        Ok(token)
    }
}

fn expiry(ttl: Duration) -> usize {
    (Utc::now() + ttl).timestamp() as usize
}
