use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::error::{PipelineError, Result};

pub const BACKEND_URL_ENV: &str = "SCOUT_BACKEND_URL";
pub const METADATA_URL_ENV: &str = "SCOUT_METADATA_URL";
pub const BACKEND_TIMEOUT_ENV: &str = "SCOUT_BACKEND_TIMEOUT_SECS";
pub const METADATA_TIMEOUT_ENV: &str = "SCOUT_METADATA_TIMEOUT_SECS";
pub const LANGUAGE_ENV: &str = "SCOUT_LANG";

/// Endpoints and deadlines for one pipeline instance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Resolution backend endpoint (POST)
    pub backend_url: String,

    /// Base URL of the season metadata service
    pub metadata_base_url: String,

    /// Deadline for each backend round
    pub backend_timeout_secs: u64,

    /// Deadline for the season lookup; expiry falls back to "latest data"
    pub metadata_timeout_secs: u64,

    /// Language sent when the query does not name one
    pub default_language: String,

    /// Extra headers sent with every backend request
    pub extra_headers: BTreeMap<String, String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            backend_url: String::new(),
            metadata_base_url: "https://api.sofascore.app/api/v1".to_string(),
            backend_timeout_secs: 30,
            metadata_timeout_secs: 10,
            default_language: scout_protocol::DEFAULT_LANGUAGE.to_string(),
            extra_headers: BTreeMap::from([(
                "ngrok-skip-browser-warning".to_string(),
                "true".to_string(),
            )]),
        }
    }
}

impl PipelineConfig {
    /// Load a TOML file; keys that are missing keep their defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            PipelineError::config(format!("failed to read {}: {err}", path.display()))
        })?;
        Self::from_toml_str(&raw)
            .map_err(|err| PipelineError::config(format!("{}: {err}", path.display())))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|err| PipelineError::config(err.to_string()))
    }

    /// Apply `SCOUT_*` environment overrides.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars(&mut self, get: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = get(BACKEND_URL_ENV) {
            self.backend_url = url;
        }
        if let Some(url) = get(METADATA_URL_ENV) {
            self.metadata_base_url = url;
        }
        if let Some(raw) = get(BACKEND_TIMEOUT_ENV) {
            self.backend_timeout_secs = parse_secs(BACKEND_TIMEOUT_ENV, &raw)?;
        }
        if let Some(raw) = get(METADATA_TIMEOUT_ENV) {
            self.metadata_timeout_secs = parse_secs(METADATA_TIMEOUT_ENV, &raw)?;
        }
        if let Some(lang) = get(LANGUAGE_ENV) {
            self.default_language = lang;
        }
        Ok(())
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_secs)
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.backend_url.trim().is_empty() {
            return Err(PipelineError::config("backend_url is not set"));
        }
        for (name, url) in [
            ("backend_url", &self.backend_url),
            ("metadata_base_url", &self.metadata_base_url),
        ] {
            let parsed = reqwest::Url::parse(url.trim())
                .map_err(|err| PipelineError::config(format!("{name} {url:?}: {err}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(PipelineError::config(format!(
                    "{name} must be http(s), got {}",
                    parsed.scheme()
                )));
            }
        }
        if self.backend_timeout_secs == 0 {
            return Err(PipelineError::config("backend_timeout_secs must be > 0"));
        }
        if self.metadata_timeout_secs == 0 {
            return Err(PipelineError::config("metadata_timeout_secs must be > 0"));
        }
        Ok(())
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|_| PipelineError::config(format!("{key} must be a whole number of seconds")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn configured() -> PipelineConfig {
        PipelineConfig {
            backend_url: "https://scout.example/webhook/boss".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn default_config_needs_backend_url() {
        let err = PipelineConfig::default().validate().unwrap_err();
        assert_eq!(err.code(), "invalid_config");
        assert!(configured().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = configured();
        config.backend_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = configured();
        config.metadata_base_url = "ftp://example.org".to_string();
        assert!(config.validate().is_err());

        let mut config = configured();
        config.backend_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_keeps_defaults_for_missing_keys() {
        let config = PipelineConfig::from_toml_str(
            r#"
            backend_url = "http://127.0.0.1:5678/webhook/boss"
            backend_timeout_secs = 45

            [extra_headers]
            x-scout = "1"
            "#,
        )
        .unwrap();
        assert_eq!(config.backend_timeout(), Duration::from_secs(45));
        assert_eq!(config.metadata_timeout(), Duration::from_secs(10));
        assert_eq!(config.default_language, "en");
        assert_eq!(config.extra_headers.get("x-scout").map(String::as_str), Some("1"));
    }

    #[test]
    fn env_overrides_win() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (BACKEND_URL_ENV, "http://localhost:9000/hook"),
            (METADATA_TIMEOUT_ENV, "3"),
            (LANGUAGE_ENV, "Spanish"),
        ]);
        let mut config = PipelineConfig::default();
        config
            .apply_vars(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.backend_url, "http://localhost:9000/hook");
        assert_eq!(config.metadata_timeout_secs, 3);
        assert_eq!(config.default_language, "Spanish");

        let bad: HashMap<&str, &str> = HashMap::from([(BACKEND_TIMEOUT_ENV, "soon")]);
        let mut config = PipelineConfig::default();
        assert!(config
            .apply_vars(|key| bad.get(key).map(|v| v.to_string()))
            .is_err());
    }
}
