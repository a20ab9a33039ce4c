use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (users, groups, channels, members)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL,
                email       TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            -- Groups are rows without a parent; channels point at their group.
            CREATE TABLE chat_groups (
                id          TEXT PRIMARY KEY,
                parent_id   TEXT REFERENCES chat_groups(id),
                resource    TEXT NOT NULL,
                title       TEXT NOT NULL,
                summary     TEXT,
                owner_id    TEXT REFERENCES users(id),
                is_private  INTEGER,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                CHECK (
                    (parent_id IS NULL AND owner_id IS NOT NULL AND is_private IS NOT NULL)
                    OR (parent_id IS NOT NULL AND owner_id IS NULL AND is_private IS NULL)
                )
            );

            CREATE UNIQUE INDEX ux_groups_owner_resource
                ON chat_groups(owner_id, resource) WHERE parent_id IS NULL;

            CREATE UNIQUE INDEX ux_groups_owner_title
                ON chat_groups(owner_id, title) WHERE parent_id IS NULL;

            CREATE UNIQUE INDEX ux_channels_parent_resource
                ON chat_groups(parent_id, resource) WHERE parent_id IS NOT NULL;

            CREATE TABLE chat_members (
                id          TEXT PRIMARY KEY,
                channel_id  TEXT NOT NULL REFERENCES chat_groups(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id),
                tier        TEXT NOT NULL DEFAULT 'read_write',
                state       TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(channel_id, user_id)
            );

            CREATE INDEX idx_members_user ON chat_members(user_id, state);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
