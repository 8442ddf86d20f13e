use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                avatar      TEXT,
                created_at  TEXT NOT NULL
            );

            -- sender/receiver hold a user id or the bot id, so no foreign keys
            CREATE TABLE messages (
                id                  TEXT PRIMARY KEY,
                conversation_key    TEXT NOT NULL,
                sender              TEXT NOT NULL,
                receiver            TEXT NOT NULL,
                kind                TEXT NOT NULL
                    CHECK (kind IN ('text', 'image', 'document', 'voice')),
                body                TEXT NOT NULL,
                theme_name          TEXT,
                theme_background    TEXT,
                theme_text          TEXT,
                created_at          TEXT NOT NULL
            );

            CREATE INDEX idx_messages_conversation
                ON messages(conversation_key, created_at);

            CREATE TABLE conversation_themes (
                conversation_key    TEXT PRIMARY KEY,
                name                TEXT NOT NULL,
                background_color    TEXT NOT NULL,
                text_color          TEXT NOT NULL,
                updated_at          TEXT NOT NULL
            );

            CREATE TABLE notifications (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id),
                sender_id   TEXT NOT NULL REFERENCES users(id),
                message     TEXT NOT NULL,
                is_read     INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_notifications_unread
                ON notifications(user_id, is_read, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
