use thiserror::Error;

use crate::store::StoreError;

/// Every way a chat operation can fail. Validation and authorization
/// conditions are returned as-is; store failures carry the operation name.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("user is not defined")]
    UserUndefined,

    #[error("a chat group with this name or title already exists")]
    ChatGroupExists,

    #[error("chat group not found")]
    ChatGroupNotFound,

    #[error("a channel with this name already exists in the group")]
    ChannelExists,

    #[error("channel not found")]
    ChannelNotFound,

    #[error("chat group is private")]
    PrivateChatGroup,

    #[error("chat group is public")]
    PublicChatGroup,

    #[error("chat group is owned by the caller")]
    SelfOwnedChatGroup,

    #[error("channel already joined")]
    ChannelAlreadyJoined,

    #[error("no user with the invitee email")]
    InvalidInviteeEmail,

    #[error("invitor does not own the chat group")]
    WrongInvitor,

    #[error("caller does not own the chat group")]
    NotChatGroupOwner,

    #[error("chat user not found")]
    ChatUserNotFound,

    #[error("unable to send invitation email: {0}")]
    UnableToSendInvitationEmail(#[source] anyhow::Error),

    #[error("unable to issue action token: {0}")]
    Token(#[source] anyhow::Error),

    #[error("store failure during {context}: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
    },
}

impl ChatError {
    /// Stable name of the condition, for transports to report.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UserUndefined => "UserUndefined",
            Self::ChatGroupExists => "ChatGroupExists",
            Self::ChatGroupNotFound => "ChatGroupNotFound",
            Self::ChannelExists => "ChannelExists",
            Self::ChannelNotFound => "ChannelNotFound",
            Self::PrivateChatGroup => "PrivateChatGroup",
            Self::PublicChatGroup => "PublicChatGroup",
            Self::SelfOwnedChatGroup => "SelfOwnedChatGroup",
            Self::ChannelAlreadyJoined => "ChannelAlreadyJoined",
            Self::InvalidInviteeEmail => "InvalidInviteeEmail",
            Self::WrongInvitor => "WrongInvitor",
            Self::NotChatGroupOwner => "NotChatGroupOwner",
            Self::ChatUserNotFound => "ChatUserNotFound",
            Self::UnableToSendInvitationEmail(_) => "UnableToSendInvitationEmail",
            Self::Token(_) => "Token",
            Self::Store { .. } => "Store",
        }
    }
}

pub type ChatResult<T> = Result<T, ChatError>;

/// Attaches the operation name to a store failure.
pub(crate) trait StoreContext<T> {
    fn during(self, context: &'static str) -> ChatResult<T>;
}

impl<T> StoreContext<T> for Result<T, StoreError> {
    fn during(self, context: &'static str) -> ChatResult<T> {
        self.map_err(|source| ChatError::Store { context, source })
    }
}
