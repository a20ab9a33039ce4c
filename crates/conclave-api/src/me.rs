use axum::{Extension, Json, extract::State, response::IntoResponse};

use conclave_types::api::{CapabilitiesResponse, RealtimeTokenResponse};

use crate::auth::AppState;
use crate::error::ApiResult;
use crate::middleware::Claims;
use crate::run_blocking;

/// GET /me/capabilities
pub async fn capabilities(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let user_id = claims.sub;
    let capabilities = run_blocking(&state, move |chat| chat.get_capabilities(user_id)).await?;
    Ok(Json(CapabilitiesResponse { user_id, capabilities }))
}

/// GET /me/groups
pub async fn grouped_channels(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let view = run_blocking(&state, move |chat| chat.get_my_grouped_channels(claims.sub)).await?;
    Ok(Json(view))
}

/// GET /me/channels
pub async fn channels(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let channels = run_blocking(&state, move |chat| chat.get_my_channels(claims.sub)).await?;
    Ok(Json(channels))
}

/// GET /me/realtime-token: capabilities signed for the pub/sub backend,
/// recomputed on every call.
pub async fn realtime_token(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let user_id = claims.sub;
    let capabilities = run_blocking(&state, move |chat| chat.get_capabilities(user_id)).await?;
    let (token, expires_at) = state.tokens.realtime_token(user_id, &capabilities)?;
    Ok(Json(RealtimeTokenResponse { token, expires_at }))
}
