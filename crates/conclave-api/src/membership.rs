use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::warn;
use uuid::Uuid;

use conclave_core::notify::{CHANNEL_ID_CLAIM, INVITEE_ID_CLAIM, TokenAction};
use conclave_types::api::{AcceptInvitationRequest, InviteRequest, SetAccessRequest};
use conclave_types::models::Membership;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::Claims;
use crate::{run_blocking, run_blocking_with};

/// POST /channels/{channel_id}/join
pub async fn join_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let membership = run_blocking(&state, move |chat| chat.join_public_channel(claims.sub, channel_id)).await?;
    Ok((StatusCode::CREATED, Json(membership)))
}

/// POST /channels/{channel_id}/invitations
pub async fn invite(
    State(state): State<AppState>,
    Path(channel_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<InviteRequest>,
) -> ApiResult<impl IntoResponse> {
    let (email, invitor) = (req.email, claims.sub);
    // The row and token are committed on a blocking worker; only delivery is awaited here.
    let prepared = run_blocking_with(&state, move |s| {
        s.chat.prepare_invitation(&s.tokens, &email, invitor, channel_id)
    })
    .await?;
    let membership = state.chat.deliver_invitation(&state.notifier, prepared).await?;
    Ok((StatusCode::CREATED, Json(membership)))
}

/// POST /invitations/accept
pub async fn accept_invitation(
    State(state): State<AppState>,
    Json(req): Json<AcceptInvitationRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(accept_token(&state, &req.token).await?))
}

/// GET /invitations/accept?token=... (the link sent by mail)
pub async fn accept_invitation_link(
    State(state): State<AppState>,
    Query(req): Query<AcceptInvitationRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(accept_token(&state, &req.token).await?))
}

/// The action token is the credential: its subject is the invitor and its
/// claims name the invitee and channel.
async fn accept_token(state: &AppState, token: &str) -> ApiResult<Membership> {
    let claims = state
        .tokens
        .verify_action(token, TokenAction::InvitationToPrivateChat)
        .map_err(|e| {
            warn!("Rejected invitation token: {}", e);
            ApiError::Unauthorized
        })?;

    let invitee = claim_id(&claims.extra, INVITEE_ID_CLAIM)?;
    let channel_id = claim_id(&claims.extra, CHANNEL_ID_CLAIM)?;
    let invitor = claims.sub;

    run_blocking(state, move |chat| {
        chat.accept_invitation_to_private_channel(invitee, invitor, channel_id)
    })
    .await
}

fn claim_id(extra: &std::collections::HashMap<String, String>, name: &str) -> ApiResult<Uuid> {
    extra
        .get(name)
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| ApiError::BadRequest(format!("invitation token lacks a valid {name}")))
}

/// DELETE /channels/{channel_id}/membership
pub async fn leave_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    run_blocking(&state, move |chat| chat.leave_channel(claims.sub, channel_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /channels/{channel_id}/members/{user_id}/access
pub async fn set_access(
    State(state): State<AppState>,
    Path((channel_id, user_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SetAccessRequest>,
) -> ApiResult<impl IntoResponse> {
    let membership = run_blocking(&state, move |chat| {
        chat.set_member_access_tier(claims.sub, channel_id, user_id, req.tier)
    })
    .await?;
    Ok(Json(membership))
}
