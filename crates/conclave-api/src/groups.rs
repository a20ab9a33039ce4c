use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use conclave_core::GroupFilter;
use conclave_core::groups::{NewChannel, NewGroup};
use conclave_types::api::{CreateChannelRequest, CreateGroupRequest, GroupListQuery, SearchQuery};

use crate::auth::AppState;
use crate::error::ApiResult;
use crate::middleware::Claims;
use crate::run_blocking;

/// POST /groups
pub async fn create_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateGroupRequest>,
) -> ApiResult<impl IntoResponse> {
    let new = NewGroup {
        name: req.name,
        title: req.title,
        summary: req.summary,
        is_private: req.is_private,
    };
    let group = run_blocking(&state, move |chat| chat.create_group(claims.sub, new)).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

/// GET /groups?owner=<uuid>&private=<bool>
pub async fn list_groups(
    State(state): State<AppState>,
    Query(query): Query<GroupListQuery>,
    Extension(_claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let filter = GroupFilter {
        owner_id: query.owner,
        is_private: query.private,
    };
    let groups = run_blocking(&state, move |chat| chat.get_chat_groups(&filter)).await?;
    Ok(Json(groups))
}

/// DELETE /groups/{group_id}
pub async fn delete_group(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    run_blocking(&state, move |chat| chat.delete_group(claims.sub, group_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /groups/{group_id}/channels
pub async fn create_channel(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
    Json(req): Json<CreateChannelRequest>,
) -> ApiResult<impl IntoResponse> {
    let new = NewChannel {
        name: req.name,
        title: req.title,
        summary: req.summary,
    };
    let channel = run_blocking(&state, move |chat| chat.create_channel(group_id, new)).await?;
    Ok((StatusCode::CREATED, Json(channel)))
}

/// GET /groups/search?q=<title fragment>
pub async fn search_groups(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
    Extension(_claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let results = run_blocking(&state, move |chat| {
        chat.search_public_channels_by_group_title(&query.q)
    })
    .await?;
    Ok(Json(results))
}
