use std::collections::btree_map::Entry;

use uuid::Uuid;

use conclave_types::models::{AccessTier, Capabilities, MembershipState, Operation};

use crate::error::{ChatError, ChatResult, StoreContext};
use crate::store::{ChatStore, GroupFilter};
use crate::{ChatService, naming};

/// Operations granted by an access tier, in grant order.
pub fn operations(tier: AccessTier) -> Vec<Operation> {
    match tier {
        AccessTier::ReadOnly => vec![Operation::Subscribe, Operation::History],
        AccessTier::ReadWrite => vec![Operation::Subscribe, Operation::Publish, Operation::History],
    }
}

/// Records a grant, keeping the broader list when the key is already present.
pub fn merge_grant(caps: &mut Capabilities, resource: String, ops: Vec<Operation>) {
    match caps.entry(resource) {
        Entry::Vacant(slot) => {
            slot.insert(ops);
        }
        Entry::Occupied(mut slot) => {
            if ops.len() > slot.get().len() {
                slot.insert(ops);
            }
        }
    }
}

impl<S: ChatStore> ChatService<S> {
    /// Resource -> operations for `user`: a wildcard read-write grant on
    /// every owned group plus one grant per Active membership.
    ///
    /// Any failed lookup fails the whole call; a partial map is never returned.
    pub fn get_capabilities(&self, user: Uuid) -> ChatResult<Capabilities> {
        self.store
            .find_user(user)
            .during("capabilities: find user")?
            .ok_or(ChatError::UserUndefined)?;

        let mut caps = Capabilities::new();

        let owned = self
            .store
            .list_groups(&GroupFilter {
                owner_id: Some(user),
                is_private: None,
            })
            .during("capabilities: owned groups")?;
        for group in owned {
            merge_grant(
                &mut caps,
                naming::group_wildcard(&group.resource),
                operations(AccessTier::ReadWrite),
            );
        }

        let memberships = self
            .store
            .list_memberships(user, Some(MembershipState::Active))
            .during("capabilities: memberships")?;
        for membership in memberships {
            let channel = self
                .store
                .find_channel(membership.channel_id)
                .during("capabilities: find channel")?
                .ok_or(ChatError::ChannelNotFound)?;
            let group = self
                .store
                .find_group(channel.group_id)
                .during("capabilities: find group")?
                .ok_or(ChatError::ChatGroupNotFound)?;

            merge_grant(
                &mut caps,
                naming::channel_key(&group.resource, &channel.resource),
                operations(membership.tier),
            );
        }

        Ok(caps)
    }
}
