use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "changeme",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub upload_dir: PathBuf,
    /// Unset disables translation; non-English sends are delivered as typed.
    pub translate_url: Option<String>,
    pub translate_api_key: Option<String>,
    pub translate_timeout: Duration,
    /// Unset disables intent classification; the bot gives its fallback reply.
    pub wit_token: Option<String>,
    pub wit_url: String,
    pub intent_timeout: Duration,
    /// Unset means permissive CORS.
    pub cors_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // Empty values count as unset.
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = var("LINGO_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("LINGO_JWT_SECRET is unset or still a placeholder; set it in your .env file and restart");
        }

        let port = match var("LINGO_PORT") {
            Some(raw) => raw.parse().with_context(|| format!("invalid LINGO_PORT '{}'", raw))?,
            None => 5000,
        };
        let millis = |key: &str| -> Result<Duration> {
            let ms = match var(key) {
                Some(raw) => raw.parse().with_context(|| format!("invalid {} '{}'", key, raw))?,
                None => 5000,
            };
            Ok(Duration::from_millis(ms))
        };

        Ok(Self {
            host: var("LINGO_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: var("LINGO_DB_PATH").unwrap_or_else(|| "lingo.db".into()).into(),
            jwt_secret,
            upload_dir: var("LINGO_UPLOAD_DIR").unwrap_or_else(|| "./uploads".into()).into(),
            translate_url: var("LINGO_TRANSLATE_URL"),
            translate_api_key: var("LINGO_TRANSLATE_API_KEY"),
            translate_timeout: millis("LINGO_TRANSLATE_TIMEOUT_MS")?,
            wit_token: var("LINGO_WIT_TOKEN"),
            wit_url: var("LINGO_WIT_URL").unwrap_or_else(|| "https://api.wit.ai".into()),
            intent_timeout: millis("LINGO_WIT_TIMEOUT_MS")?,
            cors_origin: var("LINGO_CORS_ORIGIN"),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = load(&[("LINGO_JWT_SECRET", "s3cr3t-value")]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 5000);
        assert_eq!(config.db_path, PathBuf::from("lingo.db"));
        assert_eq!(config.upload_dir, PathBuf::from("./uploads"));
        assert_eq!(config.translate_timeout, Duration::from_secs(5));
        assert_eq!(config.intent_timeout, Duration::from_secs(5));
        assert_eq!(config.wit_url, "https://api.wit.ai");
        assert!(config.translate_url.is_none());
        assert!(config.wit_token.is_none());
        assert!(config.cors_origin.is_none());
    }

    #[test]
    fn missing_or_placeholder_secret_is_fatal() {
        assert!(load(&[]).is_err());
        assert!(load(&[("LINGO_JWT_SECRET", "dev-secret-change-me")]).is_err());
        assert!(load(&[("LINGO_JWT_SECRET", "   ")]).is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("LINGO_JWT_SECRET", "s3cr3t-value"),
            ("LINGO_PORT", "8080"),
            ("LINGO_TRANSLATE_URL", "http://localhost:5001"),
            ("LINGO_TRANSLATE_TIMEOUT_MS", "250"),
            ("LINGO_WIT_TOKEN", ""),
            ("LINGO_WIT_TIMEOUT_MS", "1500"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.translate_url.as_deref(), Some("http://localhost:5001"));
        assert_eq!(config.translate_timeout, Duration::from_millis(250));
        assert_eq!(config.intent_timeout, Duration::from_millis(1500));
        assert!(config.wit_token.is_none());

        assert!(load(&[("LINGO_JWT_SECRET", "s3cr3t-value"), ("LINGO_PORT", "http")]).is_err());
        assert!(load(&[("LINGO_JWT_SECRET", "s3cr3t-value"), ("LINGO_WIT_TIMEOUT_MS", "soon")]).is_err());
    }
}
