use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use lingo_types::models::Language;

/// Text translation. Implementations may fail; the dispatcher degrades to the
/// untranslated text when they do.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target: Language) -> Result<String>;
}

/// Client for a LibreTranslate-compatible `POST /translate` endpoint.
pub struct HttpTranslator {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'static str,
    target: &'static str,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    translated_text: String,
}

impl HttpTranslator {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/translate", base_url.trim_end_matches('/')),
            api_key,
        })
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(&self, text: &str, target: Language) -> Result<String> {
        let body = TranslateRequest {
            q: text,
            source: "auto",
            target: target.code(),
            format: "text",
            api_key: self.api_key.as_deref(),
        };

        let resp: TranslateResponse = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(resp.translated_text)
    }
}

/// Used when no translation service is configured: every call fails, so
/// non-English sends are delivered untranslated.
pub struct DisabledTranslator;

#[async_trait]
impl Translator for DisabledTranslator {
    async fn translate(&self, _text: &str, _target: Language) -> Result<String> {
        bail!("translation service not configured")
    }
}
