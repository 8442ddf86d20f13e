use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ChatMessage, Notification};

/// Events sent over the WebSocket gateway.
///
/// `data` carries the same shape as the `data` field of the matching REST
/// response, so clients can share one decoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum GatewayEvent {
    /// Server confirms the connection is authenticated and subscribed
    #[serde(rename_all = "camelCase")]
    Ready { user_id: Uuid, username: String },

    /// A message was stored
    Message(ChatMessage),

    /// A notification was stored for some recipient
    Notification(Notification),
}

impl GatewayEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ready { .. } => "ready",
            Self::Message(_) => "message",
            Self::Notification(_) => "notification",
        }
    }
}
