//! Canonical resource strings for groups and channels.

/// Prefix of every group resource.
pub const GROUP_PREFIX: &str = "chat:";

/// Group resource for a caller-supplied name. No normalization.
pub fn group_resource(name: &str) -> String {
    format!("{GROUP_PREFIX}{name}")
}

/// Channel resource for a caller-supplied name, unique within its group.
pub fn channel_resource(name: &str) -> String {
    name.to_string()
}

/// `<groupResource>:*`, covering every channel of the group.
pub fn group_wildcard(group_resource: &str) -> String {
    format!("{group_resource}:*")
}

/// `<groupResource>:<channelResource>`
pub fn channel_key(group_resource: &str, channel_resource: &str) -> String {
    format!("{group_resource}:{channel_resource}")
}
