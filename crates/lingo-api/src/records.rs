//! Conversions between lingo-db rows and lingo-types models.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
use tracing::warn;
use uuid::Uuid;

use lingo_db::models::{MessageRow, NotificationRow, ThemeRow, UserRow};
use lingo_types::models::{ChatMessage, MessagePayload, Notification, Participant, Theme, User};

/// Current time at storage precision, with its stored text form.
pub fn now() -> (DateTime<Utc>, String) {
    let now = Utc::now().trunc_subsecs(6);
    (now, format_timestamp(&now))
}

/// Fixed-width RFC 3339, so stored timestamps sort lexicographically.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str, row_id: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Rows written by the sqlite3 shell use datetime('now'): no zone, no fraction.
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on row '{}': {}", raw, row_id, e);
            DateTime::default()
        })
}

fn parse_uuid(raw: &str, field: &str, row_id: &str) -> Option<Uuid> {
    raw.parse()
        .map_err(|e| warn!("Corrupt {} '{}' on row '{}': {}", field, raw, row_id, e))
        .ok()
}

pub fn theme_from_row(row: ThemeRow) -> Theme {
    Theme {
        name: row.name,
        background_color: row.background_color,
        text_color: row.text_color,
    }
}

pub fn theme_row(theme: &Theme) -> ThemeRow {
    ThemeRow {
        name: theme.name.clone(),
        background_color: theme.background_color.clone(),
        text_color: theme.text_color.clone(),
    }
}

pub fn user_from_row(row: UserRow) -> Option<User> {
    Some(User {
        id: parse_uuid(&row.id, "id", &row.id)?,
        created_at: parse_timestamp(&row.created_at, &row.id),
        username: row.username,
        email: row.email,
        avatar: row.avatar,
    })
}

/// Corrupt rows are logged and dropped rather than failing the whole page.
pub fn message_from_row(row: MessageRow) -> Option<ChatMessage> {
    let sender = row
        .sender
        .parse::<Participant>()
        .map_err(|e| warn!("Corrupt sender on message '{}': {}", row.id, e))
        .ok()?;
    let receiver = row
        .receiver
        .parse::<Participant>()
        .map_err(|e| warn!("Corrupt receiver on message '{}': {}", row.id, e))
        .ok()?;
    let id = parse_uuid(&row.id, "id", &row.id)?;
    let created_at = parse_timestamp(&row.created_at, &row.id);
    let Some(payload) = MessagePayload::from_parts(&row.kind, row.body) else {
        warn!("Unknown kind '{}' on message '{}'", row.kind, row.id);
        return None;
    };

    Some(ChatMessage {
        id,
        sender,
        receiver,
        payload,
        theme: row.theme.map(theme_from_row),
        created_at,
    })
}

pub fn notification_from_row(row: NotificationRow) -> Option<Notification> {
    Some(Notification {
        id: parse_uuid(&row.id, "id", &row.id)?,
        user_id: parse_uuid(&row.user_id, "user_id", &row.id)?,
        sender_id: parse_uuid(&row.sender_id, "sender_id", &row.id)?,
        created_at: parse_timestamp(&row.created_at, &row.id),
        message: row.message,
        is_read: row.is_read,
    })
}
