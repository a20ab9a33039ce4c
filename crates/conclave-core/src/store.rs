//! Storage boundary of the chat engine.
//!
//! The engine only talks to [`ChatStore`]. Existence checks made by the
//! engine before an insert are pre-flight; the store must reject duplicate
//! (owner, resource), (owner, title), (group, channel resource) and
//! (channel, user) records on its own and report them as
//! [`StoreError::AlreadyExists`].

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use conclave_db::Database;
use conclave_db::models::{GroupRow, MemberRow, UserRow};
use conclave_types::models::{AccessTier, Channel, ChatGroup, Membership, MembershipState, User};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("already exists")]
    AlreadyExists,
    #[error("corrupt record: {0}")]
    Corrupt(String),
    #[error("backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Narrowing for top-level group listings. `None` fields do not filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupFilter {
    pub owner_id: Option<Uuid>,
    pub is_private: Option<bool>,
}

pub trait ChatStore: Send + Sync {
    // -- Users --
    fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    // -- Groups --
    fn create_group(&self, group: &ChatGroup) -> Result<(), StoreError>;
    /// Top-level group by id.
    fn find_group(&self, id: Uuid) -> Result<Option<ChatGroup>, StoreError>;
    /// A group of `owner_id` sharing either the resource or the title.
    fn find_group_clash(&self, owner_id: Uuid, resource: &str, title: &str) -> Result<Option<ChatGroup>, StoreError>;
    fn list_groups(&self, filter: &GroupFilter) -> Result<Vec<ChatGroup>, StoreError>;
    /// Public groups whose title contains `query`, case-insensitively.
    fn search_public_groups(&self, query: &str) -> Result<Vec<ChatGroup>, StoreError>;
    /// Removes a group together with its channels, atomically. Returns the
    /// number of channels removed, `None` when the group does not exist.
    fn remove_group(&self, id: Uuid) -> Result<Option<usize>, StoreError>;

    // -- Channels --
    fn create_channel(&self, channel: &Channel) -> Result<(), StoreError>;
    fn find_channel(&self, id: Uuid) -> Result<Option<Channel>, StoreError>;
    fn find_channel_by_resource(&self, group_id: Uuid, resource: &str) -> Result<Option<Channel>, StoreError>;
    fn list_channels(&self, group_id: Uuid) -> Result<Vec<Channel>, StoreError>;

    // -- Memberships --
    fn create_membership(&self, membership: &Membership) -> Result<(), StoreError>;
    fn find_membership(&self, channel_id: Uuid, user_id: Uuid) -> Result<Option<Membership>, StoreError>;
    fn set_membership_state(&self, channel_id: Uuid, user_id: Uuid, state: MembershipState) -> Result<bool, StoreError>;
    fn set_membership_tier(&self, channel_id: Uuid, user_id: Uuid, tier: AccessTier) -> Result<bool, StoreError>;
    fn remove_membership(&self, channel_id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;
    fn list_memberships(&self, user_id: Uuid, state: Option<MembershipState>) -> Result<Vec<Membership>, StoreError>;
}

impl ChatStore for Database {
    fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.get_user_by_id(&id.to_string())?.map(user_from_row).transpose()
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.get_user_by_email(email)?.map(user_from_row).transpose()
    }

    fn create_group(&self, group: &ChatGroup) -> Result<(), StoreError> {
        let row = GroupRow {
            id: group.id.to_string(),
            parent_id: None,
            resource: group.resource.clone(),
            title: group.title.clone(),
            summary: group.summary.clone(),
            owner_id: Some(group.owner_id.to_string()),
            is_private: Some(group.is_private),
            created_at: format_timestamp(&group.created_at),
        };
        self.insert_group(&row).map_err(write_error)
    }

    fn find_group(&self, id: Uuid) -> Result<Option<ChatGroup>, StoreError> {
        self.get_top_level_group(&id.to_string())?.map(group_from_row).transpose()
    }

    fn find_group_clash(&self, owner_id: Uuid, resource: &str, title: &str) -> Result<Option<ChatGroup>, StoreError> {
        self.get_owned_group_clash(&owner_id.to_string(), resource, title)?
            .map(group_from_row)
            .transpose()
    }

    fn list_groups(&self, filter: &GroupFilter) -> Result<Vec<ChatGroup>, StoreError> {
        let owner = filter.owner_id.map(|id| id.to_string());
        self.list_top_level_groups(owner.as_deref(), filter.is_private)?
            .into_iter()
            .map(group_from_row)
            .collect()
    }

    fn search_public_groups(&self, query: &str) -> Result<Vec<ChatGroup>, StoreError> {
        self.search_public_groups_by_title(query)?
            .into_iter()
            .map(group_from_row)
            .collect()
    }

    fn remove_group(&self, id: Uuid) -> Result<Option<usize>, StoreError> {
        Ok(self.delete_group_cascade(&id.to_string())?)
    }

    fn create_channel(&self, channel: &Channel) -> Result<(), StoreError> {
        let row = GroupRow {
            id: channel.id.to_string(),
            parent_id: Some(channel.group_id.to_string()),
            resource: channel.resource.clone(),
            title: channel.title.clone(),
            summary: channel.summary.clone(),
            owner_id: None,
            is_private: None,
            created_at: format_timestamp(&channel.created_at),
        };
        self.insert_group(&row).map_err(write_error)
    }

    fn find_channel(&self, id: Uuid) -> Result<Option<Channel>, StoreError> {
        self.get_channel(&id.to_string())?.map(channel_from_row).transpose()
    }

    fn find_channel_by_resource(&self, group_id: Uuid, resource: &str) -> Result<Option<Channel>, StoreError> {
        self.get_channel_by_resource(&group_id.to_string(), resource)?
            .map(channel_from_row)
            .transpose()
    }

    fn list_channels(&self, group_id: Uuid) -> Result<Vec<Channel>, StoreError> {
        self.get_channels_for_group(&group_id.to_string())?
            .into_iter()
            .map(channel_from_row)
            .collect()
    }

    fn create_membership(&self, membership: &Membership) -> Result<(), StoreError> {
        let row = MemberRow {
            id: membership.id.to_string(),
            channel_id: membership.channel_id.to_string(),
            user_id: membership.user_id.to_string(),
            tier: membership.tier.as_str().to_string(),
            state: membership.state.as_str().to_string(),
            created_at: format_timestamp(&membership.created_at),
        };
        self.insert_member(&row).map_err(write_error)
    }

    fn find_membership(&self, channel_id: Uuid, user_id: Uuid) -> Result<Option<Membership>, StoreError> {
        self.get_member(&channel_id.to_string(), &user_id.to_string())?
            .map(membership_from_row)
            .transpose()
    }

    fn set_membership_state(
        &self,
        channel_id: Uuid,
        user_id: Uuid,
        state: MembershipState,
    ) -> Result<bool, StoreError> {
        Ok(self.update_member_state(&channel_id.to_string(), &user_id.to_string(), state.as_str())?)
    }

    fn set_membership_tier(&self, channel_id: Uuid, user_id: Uuid, tier: AccessTier) -> Result<bool, StoreError> {
        Ok(self.update_member_tier(&channel_id.to_string(), &user_id.to_string(), tier.as_str())?)
    }

    fn remove_membership(&self, channel_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.delete_member(&channel_id.to_string(), &user_id.to_string())?)
    }

    fn list_memberships(&self, user_id: Uuid, state: Option<MembershipState>) -> Result<Vec<Membership>, StoreError> {
        self.get_members_for_user(&user_id.to_string(), state.as_ref().map(MembershipState::as_str))?
            .into_iter()
            .map(membership_from_row)
            .collect()
    }
}

fn write_error(err: anyhow::Error) -> StoreError {
    if conclave_db::is_unique_violation(&err) {
        StoreError::AlreadyExists
    } else {
        StoreError::Backend(err)
    }
}

fn parse_id(value: &str, what: &str) -> Result<Uuid, StoreError> {
    value
        .parse()
        .map_err(|e| StoreError::Corrupt(format!("{what} '{value}': {e}")))
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// SQLite stores "YYYY-MM-DD HH:MM:SS" without a timezone; read it as UTC.
fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
    value
        .parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).map(|ndt| ndt.and_utc()))
        .map_err(|e| StoreError::Corrupt(format!("created_at '{value}': {e}")))
}

fn user_from_row(row: UserRow) -> Result<User, StoreError> {
    Ok(User {
        id: parse_id(&row.id, "user id")?,
        username: row.username,
        email: row.email,
        created_at: parse_timestamp(&row.created_at)?,
    })
}

fn group_from_row(row: GroupRow) -> Result<ChatGroup, StoreError> {
    let owner = row
        .owner_id
        .ok_or_else(|| StoreError::Corrupt(format!("group '{}' has no owner", row.id)))?;
    Ok(ChatGroup {
        id: parse_id(&row.id, "group id")?,
        resource: row.resource,
        title: row.title,
        summary: row.summary,
        owner_id: parse_id(&owner, "owner id")?,
        is_private: row.is_private.unwrap_or(false),
        created_at: parse_timestamp(&row.created_at)?,
    })
}

fn channel_from_row(row: GroupRow) -> Result<Channel, StoreError> {
    let parent = row
        .parent_id
        .ok_or_else(|| StoreError::Corrupt(format!("channel '{}' has no parent", row.id)))?;
    Ok(Channel {
        id: parse_id(&row.id, "channel id")?,
        group_id: parse_id(&parent, "parent id")?,
        resource: row.resource,
        title: row.title,
        summary: row.summary,
        created_at: parse_timestamp(&row.created_at)?,
    })
}

fn membership_from_row(row: MemberRow) -> Result<Membership, StoreError> {
    Ok(Membership {
        id: parse_id(&row.id, "member id")?,
        channel_id: parse_id(&row.channel_id, "channel id")?,
        user_id: parse_id(&row.user_id, "user id")?,
        tier: AccessTier::parse(&row.tier)
            .ok_or_else(|| StoreError::Corrupt(format!("tier '{}' on member '{}'", row.tier, row.id)))?,
        state: MembershipState::parse(&row.state)
            .ok_or_else(|| StoreError::Corrupt(format!("state '{}' on member '{}'", row.state, row.id)))?,
        created_at: parse_timestamp(&row.created_at)?,
    })
}
