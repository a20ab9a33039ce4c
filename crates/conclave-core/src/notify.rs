//! Collaborators of the invitation flow: the action-token issuer and the
//! out-of-band notifier.

use std::collections::HashMap;
use std::future::Future;

use uuid::Uuid;

pub use conclave_types::api::TokenAction;

/// Claim carrying the invited user's id.
pub const INVITEE_ID_CLAIM: &str = "inviteeId";
/// Claim carrying the channel the invitation is for.
pub const CHANNEL_ID_CLAIM: &str = "channelId";

/// Issues opaque signed tokens that let the bearer complete one action
/// on behalf of `actor`.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, actor: Uuid, action: TokenAction, claims: HashMap<String, String>) -> anyhow::Result<String>;
}

/// Everything needed to render and deliver an invitation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitationNotice {
    pub invitee_name: String,
    pub invitee_email: String,
    pub channel_title: String,
    pub group_title: String,
    pub accept_link: String,
}

pub trait InvitationNotifier: Send + Sync {
    fn send_invitation(&self, notice: &InvitationNotice) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// `<base>/invitations/accept?token=<token>`
pub fn accept_link(base_url: &str, token: &str) -> String {
    format!("{}/invitations/accept?token={}", base_url.trim_end_matches('/'), token)
}
