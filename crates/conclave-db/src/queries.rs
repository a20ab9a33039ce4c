use crate::models::{GroupRow, MemberRow, UserRow};
use crate::Database;
use anyhow::Result;
use rusqlite::{Connection, Row};

const USER_COLUMNS: &str = "id, username, email, password, created_at";
const GROUP_COLUMNS: &str = "id, parent_id, resource, title, summary, owner_id, is_private, created_at";
const MEMBER_COLUMNS: &str = "id, channel_id, user_id, tier, state, created_at";

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, username: &str, email: &str, password_hash: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password) VALUES (?1, ?2, ?3, ?4)",
                (id, username, email, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Email comparison is case-insensitive (column collation).
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    // -- Groups --

    pub fn insert_group(&self, row: &GroupRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO chat_groups (id, parent_id, resource, title, summary, owner_id, is_private, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    row.id,
                    row.parent_id,
                    row.resource,
                    row.title,
                    row.summary,
                    row.owner_id,
                    row.is_private,
                    row.created_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_top_level_group(&self, id: &str) -> Result<Option<GroupRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {GROUP_COLUMNS} FROM chat_groups WHERE id = ?1 AND parent_id IS NULL");
            conn.query_row(&sql, [id], map_group).optional()
        })
    }

    /// First top-level group of `owner_id` whose resource OR title matches.
    pub fn get_owned_group_clash(&self, owner_id: &str, resource: &str, title: &str) -> Result<Option<GroupRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {GROUP_COLUMNS} FROM chat_groups
                 WHERE parent_id IS NULL AND owner_id = ?1 AND (resource = ?2 OR title = ?3)
                 LIMIT 1"
            );
            conn.query_row(&sql, (owner_id, resource, title), map_group).optional()
        })
    }

    /// Top-level groups, optionally narrowed to an owner and/or privacy flag.
    pub fn list_top_level_groups(&self, owner_id: Option<&str>, is_private: Option<bool>) -> Result<Vec<GroupRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {GROUP_COLUMNS} FROM chat_groups
                 WHERE parent_id IS NULL
                   AND (?1 IS NULL OR owner_id = ?1)
                   AND (?2 IS NULL OR is_private = ?2)
                 ORDER BY created_at, rowid"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![owner_id, is_private], map_group)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Public top-level groups whose title contains `query`, ignoring case.
    pub fn search_public_groups_by_title(&self, query: &str) -> Result<Vec<GroupRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {GROUP_COLUMNS} FROM chat_groups
                 WHERE parent_id IS NULL AND is_private = 0
                   AND instr(lower(title), lower(?1)) > 0
                 ORDER BY title, rowid"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([query], map_group)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Removes a top-level group and its channels in one transaction. Member
    /// rows of those channels go with them through `ON DELETE CASCADE`.
    /// Returns the number of channels removed, or `None` when no such group exists.
    pub fn delete_group_cascade(&self, id: &str) -> Result<Option<usize>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let channels = tx.execute("DELETE FROM chat_groups WHERE parent_id = ?1", [id])?;
            let groups = tx.execute("DELETE FROM chat_groups WHERE id = ?1 AND parent_id IS NULL", [id])?;
            if groups == 0 {
                // Dropping the transaction rolls the channel delete back.
                return Ok(None);
            }
            tx.commit()?;
            Ok(Some(channels))
        })
    }

    // -- Channels --

    pub fn get_channel(&self, id: &str) -> Result<Option<GroupRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {GROUP_COLUMNS} FROM chat_groups WHERE id = ?1 AND parent_id IS NOT NULL");
            conn.query_row(&sql, [id], map_group).optional()
        })
    }

    pub fn get_channel_by_resource(&self, parent_id: &str, resource: &str) -> Result<Option<GroupRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {GROUP_COLUMNS} FROM chat_groups WHERE parent_id = ?1 AND resource = ?2");
            conn.query_row(&sql, (parent_id, resource), map_group).optional()
        })
    }

    pub fn get_channels_for_group(&self, parent_id: &str) -> Result<Vec<GroupRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {GROUP_COLUMNS} FROM chat_groups WHERE parent_id = ?1 ORDER BY created_at, rowid"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([parent_id], map_group)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_member(&self, channel_id: &str, user_id: &str) -> Result<Option<MemberRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {MEMBER_COLUMNS} FROM chat_members WHERE channel_id = ?1 AND user_id = ?2");
            conn.query_row(&sql, (channel_id, user_id), map_member).optional()
        })
    }

    /// Updates only the state column. Returns false when no row matched.
    pub fn update_member_state(&self, channel_id: &str, user_id: &str, state: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "UPDATE chat_members SET state = ?3 WHERE channel_id = ?1 AND user_id = ?2",
                (channel_id, user_id, state),
            )?;
            Ok(n > 0)
        })
    }

    /// Updates only the tier column. Returns false when no row matched.
    pub fn update_member_tier(&self, channel_id: &str, user_id: &str, tier: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "UPDATE chat_members SET tier = ?3 WHERE channel_id = ?1 AND user_id = ?2",
                (channel_id, user_id, tier),
            )?;
            Ok(n > 0)
        })
    }

    pub fn delete_member(&self, channel_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "DELETE FROM chat_members WHERE channel_id = ?1 AND user_id = ?2",
                (channel_id, user_id),
            )?;
            Ok(n > 0)
        })
    }

    /// Member rows of a user, optionally narrowed to one state.
    pub fn get_members_for_user(&self, user_id: &str, state: Option<&str>) -> Result<Vec<MemberRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MEMBER_COLUMNS} FROM chat_members
                 WHERE user_id = ?1 AND (?2 IS NULL OR state = ?2)
                 ORDER BY created_at, rowid"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, state], map_member)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn map_group(row: &Row<'_>) -> rusqlite::Result<GroupRow> {
    Ok(GroupRow {
        id: row.get(0)?,
        parent_id: row.get(1)?,
        resource: row.get(2)?,
        title: row.get(3)?,
        summary: row.get(4)?,
        owner_id: row.get(5)?,
        is_private: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn map_member(row: &Row<'_>) -> rusqlite::Result<MemberRow> {
    Ok(MemberRow {
        id: row.get(0)?,
        channel_id: row.get(1)?,
        user_id: row.get(2)?,
        tier: row.get(3)?,
        state: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
