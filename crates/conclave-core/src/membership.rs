//! Membership state machine, per (channel, user):
//!
//! - Join on a public channel creates an Active row.
//! - Invite on a private channel, by the group owner, creates an Invited
//!   row or resets an existing row of either state back to Invited.
//! - Accept, with the group owner as invitor, moves Invited to Active.
//! - Leave removes the row in any state.

use std::collections::HashMap;

use tracing::{info, warn};
use uuid::Uuid;

use conclave_types::models::{AccessTier, Channel, ChatGroup, Membership, MembershipState, User};

use crate::error::{ChatError, ChatResult, StoreContext};
use crate::notify::{
    self, CHANNEL_ID_CLAIM, INVITEE_ID_CLAIM, InvitationNotice, InvitationNotifier, TokenAction, TokenIssuer,
};
use crate::store::{ChatStore, StoreError};
use crate::{ChatService, now};

struct StagedInvitation {
    membership: Membership,
    invitee: User,
    channel: Channel,
    group: ChatGroup,
}

/// An invitation whose membership row is committed and whose notice,
/// carrying the signed accept link, is ready to go out.
#[derive(Debug, Clone)]
pub struct PreparedInvitation {
    pub membership: Membership,
    pub notice: InvitationNotice,
    pub invitor: Uuid,
}

impl<S: ChatStore> ChatService<S> {
    /// Joins a channel of a public group as an Active read-write member.
    pub fn join_public_channel(&self, user: Uuid, channel_id: Uuid) -> ChatResult<Membership> {
        let (channel, group) = self.channel_with_group(channel_id, "join channel")?;

        if group.is_private {
            return Err(ChatError::PrivateChatGroup);
        }
        if group.owner_id == user {
            return Err(ChatError::SelfOwnedChatGroup);
        }
        if self
            .store
            .find_membership(channel.id, user)
            .during("join channel: find membership")?
            .is_some()
        {
            return Err(ChatError::ChannelAlreadyJoined);
        }

        let membership = Membership {
            id: Uuid::new_v4(),
            channel_id: channel.id,
            user_id: user,
            tier: AccessTier::default(),
            state: MembershipState::Active,
            created_at: now(),
        };

        match self.store.create_membership(&membership) {
            Ok(()) => {}
            Err(StoreError::AlreadyExists) => return Err(ChatError::ChannelAlreadyJoined),
            Err(e) => return Err(e).during("join channel: insert membership"),
        }

        info!("User {} joined channel {}", user, channel.id);
        Ok(membership)
    }

    /// Invites the user registered under `invitee_email` to a private
    /// channel and sends them an accept link. Only the group owner may invite.
    ///
    /// The membership change is committed before the notification goes out.
    /// When delivery fails the row stays Invited and the caller gets
    /// [`ChatError::UnableToSendInvitationEmail`]; inviting again re-sends.
    pub async fn invite_to_private_channel<T, N>(
        &self,
        issuer: &T,
        notifier: &N,
        invitee_email: &str,
        invitor: Uuid,
        channel_id: Uuid,
    ) -> ChatResult<Membership>
    where
        T: TokenIssuer,
        N: InvitationNotifier,
    {
        let prepared = self.prepare_invitation(issuer, invitee_email, invitor, channel_id)?;
        self.deliver_invitation(notifier, prepared).await
    }

    /// Store-bound half of an invitation: validates, commits the Invited row
    /// and signs the accept token. Nothing is sent.
    pub fn prepare_invitation<T: TokenIssuer>(
        &self,
        issuer: &T,
        invitee_email: &str,
        invitor: Uuid,
        channel_id: Uuid,
    ) -> ChatResult<PreparedInvitation> {
        let staged = self.stage_invitation(invitee_email, invitor, channel_id)?;

        let claims = HashMap::from([
            (INVITEE_ID_CLAIM.to_string(), staged.invitee.id.to_string()),
            (CHANNEL_ID_CLAIM.to_string(), staged.channel.id.to_string()),
        ]);
        let token = issuer
            .issue(invitor, TokenAction::InvitationToPrivateChat, claims)
            .map_err(ChatError::Token)?;

        let notice = InvitationNotice {
            invitee_name: staged.invitee.username,
            invitee_email: staged.invitee.email,
            channel_title: staged.channel.title,
            group_title: staged.group.title,
            accept_link: notify::accept_link(&self.public_url, &token),
        };

        Ok(PreparedInvitation {
            membership: staged.membership,
            notice,
            invitor,
        })
    }

    /// Sends a prepared invitation. Touches no store.
    pub async fn deliver_invitation<N: InvitationNotifier>(
        &self,
        notifier: &N,
        prepared: PreparedInvitation,
    ) -> ChatResult<Membership> {
        let PreparedInvitation { membership, notice, invitor } = prepared;

        if let Err(e) = notifier.send_invitation(&notice).await {
            warn!(
                "Invitation of {} to channel {} committed but not delivered: {}",
                membership.user_id, membership.channel_id, e
            );
            return Err(ChatError::UnableToSendInvitationEmail(e));
        }

        info!("User {} invited {} to channel {}", invitor, membership.user_id, membership.channel_id);
        Ok(membership)
    }

    fn stage_invitation(&self, invitee_email: &str, invitor: Uuid, channel_id: Uuid) -> ChatResult<StagedInvitation> {
        let (channel, group) = self.channel_with_group(channel_id, "invite")?;

        if !group.is_private {
            return Err(ChatError::PublicChatGroup);
        }
        // Invitations, re-invites included, come from the owner only.
        if group.owner_id != invitor {
            return Err(ChatError::NotChatGroupOwner);
        }

        let invitee = self
            .store
            .find_user_by_email(invitee_email)
            .during("invite: find invitee")?
            .ok_or(ChatError::InvalidInviteeEmail)?;

        let membership = match self
            .store
            .find_membership(channel.id, invitee.id)
            .during("invite: find membership")?
        {
            Some(existing) => self.reset_to_invited(existing)?,
            None => {
                let fresh = Membership {
                    id: Uuid::new_v4(),
                    channel_id: channel.id,
                    user_id: invitee.id,
                    tier: AccessTier::default(),
                    state: MembershipState::Invited,
                    created_at: now(),
                };
                match self.store.create_membership(&fresh) {
                    Ok(()) => fresh,
                    // Lost a race with another writer; the row exists now.
                    Err(StoreError::AlreadyExists) => {
                        let existing = self
                            .store
                            .find_membership(channel.id, invitee.id)
                            .during("invite: reload membership")?
                            .ok_or(ChatError::ChatUserNotFound)?;
                        self.reset_to_invited(existing)?
                    }
                    Err(e) => return Err(e).during("invite: insert membership"),
                }
            }
        };

        Ok(StagedInvitation {
            membership,
            invitee,
            channel,
            group,
        })
    }

    /// Re-inviting revokes current access until the invitation is accepted again.
    fn reset_to_invited(&self, mut membership: Membership) -> ChatResult<Membership> {
        if membership.state == MembershipState::Active {
            info!(
                "Re-invite resets user {} on channel {} from active to invited",
                membership.user_id, membership.channel_id
            );
        }
        self.store
            .set_membership_state(membership.channel_id, membership.user_id, MembershipState::Invited)
            .during("invite: reset membership")?;
        membership.state = MembershipState::Invited;
        Ok(membership)
    }

    /// Activates the invitee's membership. `invitor` must be the owner of
    /// the channel's group.
    pub fn accept_invitation_to_private_channel(
        &self,
        invitee: Uuid,
        invitor: Uuid,
        channel_id: Uuid,
    ) -> ChatResult<Membership> {
        let (channel, group) = self.channel_with_group(channel_id, "accept invitation")?;

        if group.owner_id != invitor {
            return Err(ChatError::WrongInvitor);
        }

        let mut membership = self
            .store
            .find_membership(channel.id, invitee)
            .during("accept invitation: find membership")?
            .ok_or(ChatError::ChatUserNotFound)?;

        if !self
            .store
            .set_membership_state(channel.id, invitee, MembershipState::Active)
            .during("accept invitation: activate")?
        {
            return Err(ChatError::ChatUserNotFound);
        }
        membership.state = MembershipState::Active;

        info!("User {} accepted invitation to channel {}", invitee, channel.id);
        Ok(membership)
    }

    /// Removes the caller's membership, whatever its state.
    pub fn leave_channel(&self, user: Uuid, channel_id: Uuid) -> ChatResult<()> {
        if !self
            .store
            .remove_membership(channel_id, user)
            .during("leave channel")?
        {
            return Err(ChatError::ChannelNotFound);
        }

        info!("User {} left channel {}", user, channel_id);
        Ok(())
    }

    /// Changes a member's access tier. Only the group owner may do this and
    /// the membership state is left as it is.
    pub fn set_member_access_tier(
        &self,
        owner: Uuid,
        channel_id: Uuid,
        member: Uuid,
        tier: AccessTier,
    ) -> ChatResult<Membership> {
        let (channel, group) = self.channel_with_group(channel_id, "set access tier")?;

        if group.owner_id != owner {
            return Err(ChatError::NotChatGroupOwner);
        }

        let mut membership = self
            .store
            .find_membership(channel.id, member)
            .during("set access tier: find membership")?
            .ok_or(ChatError::ChatUserNotFound)?;

        if !self
            .store
            .set_membership_tier(channel.id, member, tier)
            .during("set access tier: update")?
        {
            return Err(ChatError::ChatUserNotFound);
        }
        membership.tier = tier;

        info!("User {} on channel {} now has {} access", member, channel.id, tier);
        Ok(membership)
    }

    fn channel_with_group(&self, channel_id: Uuid, context: &'static str) -> ChatResult<(Channel, ChatGroup)> {
        let channel = self
            .store
            .find_channel(channel_id)
            .during(context)?
            .ok_or(ChatError::ChannelNotFound)?;
        let group = self
            .store
            .find_group(channel.group_id)
            .during(context)?
            .ok_or(ChatError::ChatGroupNotFound)?;
        Ok((channel, group))
    }
}
