use std::collections::HashSet;

use tracing::warn;
use uuid::Uuid;

use conclave_types::models::{Channel, ChatGroup, GroupedChannels};

use crate::ChatService;
use crate::error::{ChatResult, StoreContext};
use crate::store::{ChatStore, GroupFilter};

impl<S: ChatStore> ChatService<S> {
    /// Groups relevant to `user` with the channels they can see.
    ///
    /// Owned groups show every channel. Other groups appear because the user
    /// holds a membership (Invited or Active) on one of their channels, and
    /// show only the channels the user holds a membership on. Sub-lookup
    /// failures are logged and leave that part of the view out.
    pub fn get_my_grouped_channels(&self, user: Uuid) -> ChatResult<Vec<GroupedChannels>> {
        let owned = self
            .store
            .list_groups(&GroupFilter {
                owner_id: Some(user),
                is_private: None,
            })
            .during("grouped view: owned groups")?;
        let memberships = self
            .store
            .list_memberships(user, None)
            .during("grouped view: memberships")?;

        let member_channels: HashSet<Uuid> = memberships.iter().map(|m| m.channel_id).collect();

        let mut seen = HashSet::new();
        let mut groups: Vec<ChatGroup> = Vec::new();
        for group in owned {
            if seen.insert(group.id) {
                groups.push(group);
            }
        }
        for membership in &memberships {
            if let Some(group) = self.parent_of(membership.channel_id) {
                if seen.insert(group.id) {
                    groups.push(group);
                }
            }
        }

        let view = groups
            .into_iter()
            .map(|group| {
                let owns = group.owner_id == user;
                let channels = match self.store.list_channels(group.id) {
                    Ok(channels) => channels
                        .into_iter()
                        .filter(|c| owns || member_channels.contains(&c.id))
                        .collect(),
                    Err(e) => {
                        warn!("Listing channels of group {} for user {}: {}", group.id, user, e);
                        Vec::new()
                    }
                };
                GroupedChannels { group, channels }
            })
            .collect();

        Ok(view)
    }

    /// The grouped view flattened into one channel list.
    pub fn get_my_channels(&self, user: Uuid) -> ChatResult<Vec<Channel>> {
        Ok(self
            .get_my_grouped_channels(user)?
            .into_iter()
            .flat_map(|g| g.channels)
            .collect())
    }

    fn parent_of(&self, channel_id: Uuid) -> Option<ChatGroup> {
        let channel = match self.store.find_channel(channel_id) {
            Ok(Some(channel)) => channel,
            Ok(None) => {
                warn!("Membership references missing channel {}", channel_id);
                return None;
            }
            Err(e) => {
                warn!("Resolving channel {}: {}", channel_id, e);
                return None;
            }
        };
        match self.store.find_group(channel.group_id) {
            Ok(Some(group)) => Some(group),
            Ok(None) => {
                warn!("Channel {} references missing group {}", channel_id, channel.group_id);
                None
            }
            Err(e) => {
                warn!("Resolving group {}: {}", channel.group_id, e);
                None
            }
        }
    }
}
