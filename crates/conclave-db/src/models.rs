/// Database row types. These map directly to SQLite rows.
/// Distinct from conclave-types models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

/// A `chat_groups` row. Top-level rows carry `owner_id`/`is_private`,
/// channel rows carry `parent_id`.
pub struct GroupRow {
    pub id: String,
    pub parent_id: Option<String>,
    pub resource: String,
    pub title: String,
    pub summary: Option<String>,
    pub owner_id: Option<String>,
    pub is_private: Option<bool>,
    pub created_at: String,
}

pub struct MemberRow {
    pub id: String,
    pub channel_id: String,
    pub user_id: String,
    pub tier: String,
    pub state: String,
    pub created_at: String,
}
