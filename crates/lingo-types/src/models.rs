use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Wire id of the assistant. It is not backed by a users row.
pub const BOT_ID: &str = "chatbot";

// -- Participants --

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid participant id '{0}'")]
pub struct InvalidParticipant(pub String);

/// One side of a conversation: a registered user or the assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Participant {
    User(Uuid),
    Bot,
}

impl Participant {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Self::User(id) => Some(*id),
            Self::Bot => None,
        }
    }

    pub fn is_bot(&self) -> bool {
        matches!(self, Self::Bot)
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "{}", id),
            Self::Bot => f.write_str(BOT_ID),
        }
    }
}

impl FromStr for Participant {
    type Err = InvalidParticipant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == BOT_ID {
            return Ok(Self::Bot);
        }
        s.parse::<Uuid>()
            .map(Self::User)
            .map_err(|_| InvalidParticipant(s.to_string()))
    }
}

impl TryFrom<String> for Participant {
    type Error = InvalidParticipant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Participant> for String {
    fn from(value: Participant) -> Self {
        value.to_string()
    }
}

/// Canonical identity of the unordered pair `{a, b}`.
///
/// Both orderings of the same two participants produce the same key, so
/// history, theme and snapshot lookups never branch on direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationKey(String);

impl ConversationKey {
    pub fn new(a: &Participant, b: &Participant) -> Self {
        let (a, b) = (a.to_string(), b.to_string());
        if a <= b {
            Self(format!("{}:{}", a, b))
        } else {
            Self(format!("{}:{}", b, a))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// -- Languages --

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unsupported target language '{0}'")]
pub struct UnsupportedLanguage(pub String);

/// Closed set of translation targets. English is the no-op default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Fr,
    Es,
    De,
    It,
    Pt,
    Ru,
}

impl Language {
    pub const ALL: [Language; 7] = [
        Self::En,
        Self::Fr,
        Self::Es,
        Self::De,
        Self::It,
        Self::Pt,
        Self::Ru,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Fr => "fr",
            Self::Es => "es",
            Self::De => "de",
            Self::It => "it",
            Self::Pt => "pt",
            Self::Ru => "ru",
        }
    }

    pub fn is_default(&self) -> bool {
        *self == Self::En
    }
}

impl FromStr for Language {
    type Err = UnsupportedLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|lang| lang.code() == s)
            .ok_or_else(|| UnsupportedLanguage(s.to_string()))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// -- Messages --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub name: String,
    pub background_color: String,
    pub text_color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Document,
    Voice,
}

impl AttachmentKind {
    /// Noun phrase used in notification text.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Image => "an image",
            Self::Document => "a document",
            Self::Voice => "a voice message",
        }
    }
}

/// The single primary payload of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MessagePayload {
    Text { text: String },
    Image { url: String },
    Document { url: String },
    Voice { url: String },
}

impl MessagePayload {
    pub fn attachment(kind: AttachmentKind, url: String) -> Self {
        match kind {
            AttachmentKind::Image => Self::Image { url },
            AttachmentKind::Document => Self::Document { url },
            AttachmentKind::Voice => Self::Voice { url },
        }
    }

    /// Storage discriminant, paired with [`MessagePayload::body`].
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Image { .. } => "image",
            Self::Document { .. } => "document",
            Self::Voice { .. } => "voice",
        }
    }

    pub fn body(&self) -> &str {
        match self {
            Self::Text { text } => text,
            Self::Image { url } | Self::Document { url } | Self::Voice { url } => url,
        }
    }

    /// Rebuild a payload from its stored `(kind, body)` pair.
    pub fn from_parts(kind: &str, body: String) -> Option<Self> {
        Some(match kind {
            "text" => Self::Text { text: body },
            "image" => Self::Image { url: body },
            "document" => Self::Document { url: body },
            "voice" => Self::Voice { url: body },
            _ => return None,
        })
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender: Participant,
    pub receiver: Participant,
    #[serde(flatten)]
    pub payload: MessagePayload,
    /// Conversation theme at the moment the message was stored.
    pub theme: Option<Theme>,
    pub created_at: DateTime<Utc>,
}

// -- Notifications --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub sender_id: Uuid,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

// -- Users --

/// Public view of an account. The credential hash never leaves lingo-db.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participant_parses_bot_and_users() {
        assert_eq!("chatbot".parse::<Participant>().unwrap(), Participant::Bot);

        let id = Uuid::new_v4();
        assert_eq!(id.to_string().parse::<Participant>().unwrap(), Participant::User(id));

        assert!("not-a-user".parse::<Participant>().is_err());
    }

    #[test]
    fn participant_serializes_as_plain_string() {
        let json = serde_json::to_string(&Participant::Bot).unwrap();
        assert_eq!(json, "\"chatbot\"");

        let id = Uuid::new_v4();
        let back: Participant = serde_json::from_str(&format!("\"{}\"", id)).unwrap();
        assert_eq!(back, Participant::User(id));
    }

    #[test]
    fn conversation_key_ignores_direction() {
        let a = Participant::User(Uuid::new_v4());
        let b = Participant::User(Uuid::new_v4());
        assert_eq!(ConversationKey::new(&a, &b), ConversationKey::new(&b, &a));
        assert_eq!(
            ConversationKey::new(&a, &Participant::Bot),
            ConversationKey::new(&Participant::Bot, &a)
        );
        assert_ne!(ConversationKey::new(&a, &b), ConversationKey::new(&a, &Participant::Bot));
    }

    #[test]
    fn only_listed_languages_are_supported() {
        for code in ["en", "fr", "es", "de", "it", "pt", "ru"] {
            assert_eq!(code.parse::<Language>().unwrap().code(), code);
        }
        assert_eq!("xx".parse::<Language>(), Err(UnsupportedLanguage("xx".into())));
        assert!("EN".parse::<Language>().is_err());
        assert!(Language::En.is_default());
        assert!(!Language::Fr.is_default());
    }

    #[test]
    fn message_payload_flattens_into_message() {
        let msg = ChatMessage {
            id: Uuid::new_v4(),
            sender: Participant::Bot,
            receiver: Participant::User(Uuid::new_v4()),
            payload: MessagePayload::Voice { url: "/uploads/a.ogg".into() },
            theme: None,
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["kind"], "voice");
        assert_eq!(value["url"], "/uploads/a.ogg");
        assert_eq!(value["sender"], "chatbot");
    }

    #[test]
    fn payload_parts_rebuild() {
        let payload = MessagePayload::attachment(AttachmentKind::Document, "/uploads/x.pdf".into());
        let rebuilt = MessagePayload::from_parts(payload.kind(), payload.body().to_string());
        assert_eq!(rebuilt, Some(payload));
        assert_eq!(MessagePayload::from_parts("sticker", String::new()), None);
    }
}
