use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{AccessTier, Capabilities};

// -- JWT Claims --

/// Session token claims, issued at register/login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

/// Kinds of single-purpose action tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenAction {
    InvitationToPrivateChat,
}

/// Claims of an action token. `sub` is the actor that issued the action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionClaims {
    pub sub: Uuid,
    pub action: TokenAction,
    pub exp: usize,
    #[serde(flatten)]
    pub extra: HashMap<String, String>,
}

/// Claims of a realtime token handed to the pub/sub backend.
/// `capability` is the JSON-encoded resource -> operations map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeClaims {
    pub sub: Uuid,
    pub capability: String,
    pub iat: usize,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

// -- Groups & channels --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateGroupRequest {
    pub name: String,
    pub title: String,
    pub summary: Option<String>,
    #[serde(default)]
    pub is_private: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateChannelRequest {
    pub name: String,
    pub title: String,
    pub summary: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GroupListQuery {
    pub owner: Option<Uuid>,
    pub private: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

// -- Membership --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InviteRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AcceptInvitationRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetAccessRequest {
    pub tier: AccessTier,
}

// -- Me --

#[derive(Debug, Serialize, Deserialize)]
pub struct CapabilitiesResponse {
    pub user_id: Uuid,
    pub capabilities: Capabilities,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RealtimeTokenResponse {
    pub token: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
