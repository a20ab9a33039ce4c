use std::future::Future;

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use conclave_core::notify::{InvitationNotice, InvitationNotifier};

/// Message body accepted by the mail relay.
#[derive(Debug, Serialize)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

pub fn render_invitation(from: &str, notice: &InvitationNotice) -> MailMessage {
    MailMessage {
        from: from.to_string(),
        to: notice.invitee_email.clone(),
        subject: format!("You're invited to #{} in {}", notice.channel_title, notice.group_title),
        text: format!(
            "Hi {},\n\n\
             You have been invited to the private channel \"{}\" of \"{}\".\n\
             Accept the invitation here:\n\n{}\n\n\
             If you did not expect this, ignore this message.\n",
            notice.invitee_name, notice.channel_title, notice.group_title, notice.accept_link
        ),
    }
}

/// Posts rendered invitations to an HTTP mail relay.
pub struct MailRelayNotifier {
    client: reqwest::Client,
    relay_url: String,
    from: String,
}

impl MailRelayNotifier {
    pub fn new(relay_url: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            relay_url: relay_url.into(),
            from: from.into(),
        }
    }

    async fn deliver(&self, notice: &InvitationNotice) -> Result<()> {
        let message = render_invitation(&self.from, notice);
        self.client
            .post(self.relay_url.as_str())
            .json(&message)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Invitation delivery as configured at startup.
pub enum Notifier {
    MailRelay(MailRelayNotifier),
    /// No relay configured: log the invitation instead.
    Log,
}

impl InvitationNotifier for Notifier {
    fn send_invitation(&self, notice: &InvitationNotice) -> impl Future<Output = Result<()>> + Send {
        async move {
            match self {
                Self::MailRelay(relay) => relay.deliver(notice).await,
                Self::Log => {
                    info!(
                        "Invitation for {} to {}/{}: {}",
                        notice.invitee_email, notice.group_title, notice.channel_title, notice.accept_link
                    );
                    Ok(())
                }
            }
        }
    }
}
