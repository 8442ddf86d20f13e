use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

/// Wit.ai API version pinned for response shape stability.
const WIT_API_VERSION: &str = "20240304";

/// Coarse intent of a message sent to the assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Greet,
    Bye,
    Thanks,
    Unknown,
}

impl Intent {
    pub fn from_name(name: &str) -> Self {
        match name {
            "greet" => Self::Greet,
            "bye" => Self::Bye,
            "thanks" => Self::Thanks,
            _ => Self::Unknown,
        }
    }

    /// Canned reply the assistant sends back.
    pub fn reply(&self) -> &'static str {
        match self {
            Self::Greet => "Hello! How can I help you today?",
            Self::Bye => "Goodbye! Have a great day!",
            Self::Thanks => "You're welcome!",
            Self::Unknown => "I'm not sure how to respond to that. Can you please rephrase?",
        }
    }
}

#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Intent>;
}

/// Client for the Wit.ai `GET /message` endpoint. Only the top-ranked intent
/// is used.
pub struct WitClassifier {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

#[derive(Deserialize)]
struct WitResponse {
    #[serde(default)]
    intents: Vec<WitIntent>,
}

#[derive(Deserialize)]
struct WitIntent {
    name: String,
}

impl WitClassifier {
    pub fn new(base_url: &str, token: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/message", base_url.trim_end_matches('/')),
            token,
        })
    }
}

#[async_trait]
impl IntentClassifier for WitClassifier {
    async fn classify(&self, text: &str) -> Result<Intent> {
        let resp: WitResponse = self
            .client
            .get(&self.endpoint)
            .query(&[("v", WIT_API_VERSION), ("q", text)])
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(resp
            .intents
            .first()
            .map(|i| Intent::from_name(&i.name))
            .unwrap_or(Intent::Unknown))
    }
}

/// Used when no classifier token is configured: the assistant always gives
/// the fallback reply.
pub struct DisabledClassifier;

#[async_trait]
impl IntentClassifier for DisabledClassifier {
    async fn classify(&self, _text: &str) -> Result<Intent> {
        Ok(Intent::Unknown)
    }
}
