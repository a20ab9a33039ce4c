use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use conclave_core::ChatError;
use conclave_types::api::ErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("unauthorized")]
    Unauthorized,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

fn chat_status(err: &ChatError) -> StatusCode {
    match err {
        ChatError::UserUndefined => StatusCode::UNAUTHORIZED,
        ChatError::ChatGroupNotFound | ChatError::ChannelNotFound | ChatError::ChatUserNotFound => {
            StatusCode::NOT_FOUND
        }
        ChatError::ChatGroupExists
        | ChatError::ChannelExists
        | ChatError::ChannelAlreadyJoined
        | ChatError::SelfOwnedChatGroup => StatusCode::CONFLICT,
        ChatError::PrivateChatGroup | ChatError::WrongInvitor | ChatError::NotChatGroupOwner => {
            StatusCode::FORBIDDEN
        }
        ChatError::PublicChatGroup => StatusCode::BAD_REQUEST,
        ChatError::InvalidInviteeEmail => StatusCode::UNPROCESSABLE_ENTITY,
        ChatError::UnableToSendInvitationEmail(_) => StatusCode::BAD_GATEWAY,
        ChatError::Token(_) | ChatError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match &self {
            Self::Chat(e) => (chat_status(e), e.kind(), e.to_string()),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized", self.to_string()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BadRequest", msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "Conflict", msg.clone()),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal", self.to_string()),
        };

        // Infrastructure details stay in the log.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("{}", self);
            "internal server error".to_string()
        } else {
            message
        };

        (
            status,
            Json(ErrorResponse {
                error: kind.to_string(),
                message,
            }),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
