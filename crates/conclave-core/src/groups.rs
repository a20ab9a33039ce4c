use tracing::{info, warn};
use uuid::Uuid;

use conclave_types::models::{Channel, ChatGroup, GroupedChannels};

use crate::error::{ChatError, ChatResult, StoreContext};
use crate::store::{ChatStore, GroupFilter, StoreError};
use crate::{ChatService, naming, now};

#[derive(Debug, Clone)]
pub struct NewGroup {
    pub name: String,
    pub title: String,
    pub summary: Option<String>,
    pub is_private: bool,
}

#[derive(Debug, Clone)]
pub struct NewChannel {
    pub name: String,
    pub title: String,
    pub summary: Option<String>,
}

impl<S: ChatStore> ChatService<S> {
    /// Creates a top-level group owned by `owner`. Rejected when the owner
    /// already has a group with the same resource name or the same title.
    pub fn create_group(&self, owner: Uuid, new: NewGroup) -> ChatResult<ChatGroup> {
        self.store
            .find_user(owner)
            .during("create group: find owner")?
            .ok_or(ChatError::UserUndefined)?;

        let resource = naming::group_resource(&new.name);
        if self
            .store
            .find_group_clash(owner, &resource, &new.title)
            .during("create group: check clash")?
            .is_some()
        {
            return Err(ChatError::ChatGroupExists);
        }

        let group = ChatGroup {
            id: Uuid::new_v4(),
            resource,
            title: new.title,
            summary: new.summary,
            owner_id: owner,
            is_private: new.is_private,
            created_at: now(),
        };

        match self.store.create_group(&group) {
            Ok(()) => {}
            Err(StoreError::AlreadyExists) => return Err(ChatError::ChatGroupExists),
            Err(e) => return Err(e).during("create group: insert"),
        }

        info!("Chat group {} ({}) created by {}", group.resource, group.id, owner);
        Ok(group)
    }

    /// Creates a channel under an existing top-level group. The channel
    /// carries no owner or privacy of its own.
    pub fn create_channel(&self, group_id: Uuid, new: NewChannel) -> ChatResult<Channel> {
        let group = self
            .store
            .find_group(group_id)
            .during("create channel: find group")?
            .ok_or(ChatError::ChatGroupNotFound)?;

        let resource = naming::channel_resource(&new.name);
        if self
            .store
            .find_channel_by_resource(group.id, &resource)
            .during("create channel: check clash")?
            .is_some()
        {
            return Err(ChatError::ChannelExists);
        }

        let channel = Channel {
            id: Uuid::new_v4(),
            group_id: group.id,
            resource,
            title: new.title,
            summary: new.summary,
            created_at: now(),
        };

        match self.store.create_channel(&channel) {
            Ok(()) => {}
            Err(StoreError::AlreadyExists) => return Err(ChatError::ChannelExists),
            Err(e) => return Err(e).during("create channel: insert"),
        }

        info!(
            "Channel {} ({}) created",
            naming::channel_key(&group.resource, &channel.resource),
            channel.id
        );
        Ok(channel)
    }

    /// Deletes a group and its channels. Only the owner may delete.
    pub fn delete_group(&self, owner: Uuid, group_id: Uuid) -> ChatResult<()> {
        let group = self
            .store
            .find_group(group_id)
            .during("delete group: find group")?
            .filter(|g| g.owner_id == owner)
            .ok_or(ChatError::ChatGroupNotFound)?;

        // Gone between lookup and delete: report it like any missing group.
        let removed = self
            .store
            .remove_group(group.id)
            .during("delete group: remove")?
            .ok_or(ChatError::ChatGroupNotFound)?;

        info!("Chat group {} deleted by {} ({} channels)", group.resource, owner, removed);
        Ok(())
    }

    /// Top-level groups matching `filter`. Empty when nothing matches.
    pub fn get_chat_groups(&self, filter: &GroupFilter) -> ChatResult<Vec<ChatGroup>> {
        self.store.list_groups(filter).during("list chat groups")
    }

    /// Public groups whose title contains `query` (any case), each with its
    /// channels. Groups without channels are left out; a group whose
    /// channels cannot be read is logged and skipped.
    pub fn search_public_channels_by_group_title(&self, query: &str) -> ChatResult<Vec<GroupedChannels>> {
        let groups = self
            .store
            .search_public_groups(query)
            .during("search public groups")?;

        let mut results = Vec::with_capacity(groups.len());
        for group in groups {
            match self.store.list_channels(group.id) {
                Ok(channels) if channels.is_empty() => {}
                Ok(channels) => results.push(GroupedChannels { group, channels }),
                Err(e) => warn!("Skipping group {} in title search: {}", group.id, e),
            }
        }

        Ok(results)
    }
}
