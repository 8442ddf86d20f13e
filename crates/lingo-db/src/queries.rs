use crate::Database;
use crate::models::{MessageRow, NewMessage, NotificationRow, ThemeRow, UserRow};
use anyhow::Result;
use rusqlite::{Connection, Row};

const USER_COLUMNS: &str = "id, username, email, password, avatar, created_at";

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        email: &str,
        password_hash: &str,
        created_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, username, email, password_hash, created_at],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            query_user(conn, &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"), email)
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    /// Every user except `id`, oldest account first.
    pub fn list_users_except(&self, id: &str) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE id != ?1 ORDER BY created_at ASC, rowid ASC"
            ))?;
            let rows = stmt
                .query_map([id], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Apply the provided fields; `None` keeps the stored value.
    /// Returns the updated row, or `None` if the user does not exist.
    pub fn update_profile(
        &self,
        id: &str,
        username: Option<&str>,
        email: Option<&str>,
        avatar: Option<&str>,
    ) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET
                    username = COALESCE(?2, username),
                    email = COALESCE(?3, email),
                    avatar = COALESCE(?4, avatar)
                 WHERE id = ?1",
                rusqlite::params![id, username, email, avatar],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_user_by_id(conn, id)
        })
    }

    // -- Messages --

    /// Insert a message, stamping it with the conversation's current theme.
    /// Returns the theme snapshot that was stored alongside it.
    pub fn insert_message(&self, msg: &NewMessage<'_>) -> Result<Option<ThemeRow>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let theme = query_theme(&tx, msg.conversation_key)?;

            tx.execute(
                "INSERT INTO messages (
                    id, conversation_key, sender, receiver, kind, body,
                    theme_name, theme_background, theme_text, created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    msg.id,
                    msg.conversation_key,
                    msg.sender,
                    msg.receiver,
                    msg.kind,
                    msg.body,
                    theme.as_ref().map(|t| t.name.as_str()),
                    theme.as_ref().map(|t| t.background_color.as_str()),
                    theme.as_ref().map(|t| t.text_color.as_str()),
                    msg.created_at,
                ],
            )?;
            tx.commit()?;

            Ok(theme)
        })
    }

    /// All messages of one conversation, oldest first. Rows with an equal
    /// timestamp keep insertion order.
    pub fn get_conversation(&self, conversation_key: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, sender, receiver, kind, body,
                        theme_name, theme_background, theme_text, created_at
                 FROM messages
                 WHERE conversation_key = ?1
                 ORDER BY created_at ASC, rowid ASC",
            )?;

            let rows = stmt
                .query_map([conversation_key], |row| {
                    let theme = match (
                        row.get::<_, Option<String>>(5)?,
                        row.get::<_, Option<String>>(6)?,
                        row.get::<_, Option<String>>(7)?,
                    ) {
                        (Some(name), Some(background_color), Some(text_color)) => Some(ThemeRow {
                            name,
                            background_color,
                            text_color,
                        }),
                        _ => None,
                    };
                    Ok(MessageRow {
                        id: row.get(0)?,
                        sender: row.get(1)?,
                        receiver: row.get(2)?,
                        kind: row.get(3)?,
                        body: row.get(4)?,
                        theme,
                        created_at: row.get(8)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Themes --

    /// Create or overwrite the theme of a conversation. Messages are untouched.
    pub fn upsert_theme(&self, conversation_key: &str, theme: &ThemeRow, updated_at: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO conversation_themes (conversation_key, name, background_color, text_color, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(conversation_key) DO UPDATE SET
                    name = excluded.name,
                    background_color = excluded.background_color,
                    text_color = excluded.text_color,
                    updated_at = excluded.updated_at",
                rusqlite::params![
                    conversation_key,
                    theme.name,
                    theme.background_color,
                    theme.text_color,
                    updated_at
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_theme(&self, conversation_key: &str) -> Result<Option<ThemeRow>> {
        self.with_conn(|conn| query_theme(conn, conversation_key))
    }

    // -- Notifications --

    pub fn insert_notification(
        &self,
        id: &str,
        user_id: &str,
        sender_id: &str,
        message: &str,
        created_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notifications (id, user_id, sender_id, message, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, user_id, sender_id, message, created_at],
            )?;
            Ok(())
        })
    }

    /// Unread notifications for a user, newest first.
    pub fn get_unread_notifications(&self, user_id: &str) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, sender_id, message, is_read, created_at
                 FROM notifications
                 WHERE user_id = ?1 AND is_read = 0
                 ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map([user_id], notification_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Flag a notification as read. Marking an already-read one is a no-op
    /// that still returns the row; `None` means the id is unknown.
    pub fn mark_notification_read(&self, id: &str) -> Result<Option<NotificationRow>> {
        self.with_conn(|conn| {
            conn.execute("UPDATE notifications SET is_read = 1 WHERE id = ?1", [id])?;
            let row = conn
                .query_row(
                    "SELECT id, user_id, sender_id, message, is_read, created_at
                     FROM notifications WHERE id = ?1",
                    [id],
                    notification_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        avatar: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<NotificationRow> {
    Ok(NotificationRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        sender_id: row.get(2)?,
        message: row.get(3)?,
        is_read: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn query_user(conn: &Connection, sql: &str, param: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(sql)?;
    let row = stmt.query_row([param], user_from_row).optional()?;
    Ok(row)
}

fn query_user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    query_user(conn, &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"), id)
}

fn query_theme(conn: &Connection, conversation_key: &str) -> Result<Option<ThemeRow>> {
    let row = conn
        .query_row(
            "SELECT name, background_color, text_color FROM conversation_themes WHERE conversation_key = ?1",
            [conversation_key],
            |row| {
                Ok(ThemeRow {
                    name: row.get(0)?,
                    background_color: row.get(1)?,
                    text_color: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(row)
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
