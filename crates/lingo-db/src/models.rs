//! Database row types. These map directly to SQLite rows and stay free of
//! lingo-types so the storage layer does not depend on the API models.

#[derive(Debug)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub avatar: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeRow {
    pub name: String,
    pub background_color: String,
    pub text_color: String,
}

pub struct MessageRow {
    pub id: String,
    pub sender: String,
    pub receiver: String,
    pub kind: String,
    pub body: String,
    pub theme: Option<ThemeRow>,
    pub created_at: String,
}

/// Borrowed insert payload for [`crate::Database::insert_message`].
pub struct NewMessage<'a> {
    pub id: &'a str,
    pub conversation_key: &'a str,
    pub sender: &'a str,
    pub receiver: &'a str,
    pub kind: &'a str,
    pub body: &'a str,
    pub created_at: &'a str,
}

pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub sender_id: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: String,
}
