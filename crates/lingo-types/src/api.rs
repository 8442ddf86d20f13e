use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ChatMessage, Notification, Participant, Theme};

// -- JWT Claims --

/// JWT claims shared by the REST middleware and the gateway upgrade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Envelopes --

#[derive(Debug, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { success: true, data }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Returned by both register and login.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub username: String,
    pub email: String,
    pub avatar: Option<String>,
}

// -- Messages --

/// Sender and receiver stay raw strings here; the dispatcher resolves them
/// so a malformed id becomes a validation error rather than a body rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub sender: String,
    pub receiver: String,
    pub message: String,
    pub target_language: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SentMessages {
    One(ChatMessage),
    Many(Vec<ChatMessage>),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub success: bool,
    pub data: SentMessages,
    pub translations_available: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendAttachmentRequest {
    pub sender: String,
    pub receiver: String,
    pub file_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub file_url: String,
    pub size: u64,
}

// -- Themes --

#[derive(Debug, Deserialize)]
pub struct SaveThemeRequest {
    pub sender: Participant,
    pub receiver: Participant,
    pub theme: Theme,
}

#[derive(Debug, Deserialize)]
pub struct ThemeQuery {
    pub sender: Participant,
    pub receiver: Participant,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ThemeResponse {
    pub success: bool,
    pub theme: Theme,
}

// -- Notifications --

pub type NotificationList = DataResponse<Vec<Notification>>;
