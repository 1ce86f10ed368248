use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod wire;

pub use wire::{BackendQuery, BackendRequest, ErrorBody, ErrorEnvelope, GenerateRequest};

pub const SCHEMA_VERSION: u32 = 1;

pub const DEFAULT_LANGUAGE: &str = "en";

/// A caller's search input.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    #[serde(default)]
    pub primary_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_name: Option<String>,
    #[serde(default)]
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
}

impl Query {
    pub fn new(primary_name: impl Into<String>) -> Self {
        Self {
            primary_name: primary_name.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_secondary_name(mut self, name: impl Into<String>) -> Self {
        self.secondary_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    #[must_use]
    pub fn with_organization_id(mut self, id: impl Into<String>) -> Self {
        self.organization_id = Some(id.into());
        self
    }

    /// True when none of the identifying fields carries any text.
    pub fn is_empty(&self) -> bool {
        non_blank(Some(&self.primary_name)).is_none()
            && non_blank(self.secondary_name.as_deref()).is_none()
            && non_blank(self.organization_id.as_deref()).is_none()
    }

    pub fn primary_name(&self) -> Option<&str> {
        non_blank(Some(&self.primary_name))
    }

    pub fn secondary_name(&self) -> Option<&str> {
        non_blank(self.secondary_name.as_deref())
    }

    pub fn organization_id(&self) -> Option<&str> {
        non_blank(self.organization_id.as_deref())
    }

    pub fn language_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        non_blank(Some(&self.language)).unwrap_or(fallback)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// One disambiguation choice.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: String,
    pub display_name: String,
    pub organization_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub country_name: String,
    #[serde(default)]
    pub role_label: String,
}

/// A selectable season of one tournament.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContextOption {
    pub label: String,
    pub season_id: String,
    pub tournament_id: String,
    pub sort_year: String,
}

impl ContextOption {
    pub fn key(&self) -> ContextKey {
        ContextKey {
            season_id: self.season_id.clone(),
            tournament_id: self.tournament_id.clone(),
        }
    }

    pub fn matches(&self, key: &ContextKey) -> bool {
        self.season_id == key.season_id && self.tournament_id == key.tournament_id
    }
}

/// Identity of a [`ContextOption`]. Rendered as `season|tournament`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ContextKey {
    pub season_id: String,
    pub tournament_id: String,
}

impl ContextKey {
    pub fn new(season_id: impl Into<String>, tournament_id: impl Into<String>) -> Self {
        Self {
            season_id: season_id.into(),
            tournament_id: tournament_id.into(),
        }
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.season_id, self.tournament_id)
    }
}

impl FromStr for ContextKey {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        let Some((season, tournament)) = raw.split_once('|') else {
            anyhow::bail!("context key must look like <season_id>|<tournament_id>, got {raw:?}");
        };
        Ok(Self::new(season.trim(), tournament.trim()))
    }
}

/// A finished report as returned by the backend. The body is never parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifact {
    pub media_type: String,
    pub body: Vec<u8>,
}

impl ReportArtifact {
    pub const HTML: &'static str = "text/html";
    pub const JSON: &'static str = "application/json";

    pub fn html(body: impl Into<Vec<u8>>) -> Self {
        Self {
            media_type: Self::HTML.to_string(),
            body: body.into(),
        }
    }

    pub fn json(body: impl Into<Vec<u8>>) -> Self {
        Self {
            media_type: Self::JSON.to_string(),
            body: body.into(),
        }
    }

    pub fn is_json(&self) -> bool {
        self.media_type == Self::JSON
    }

    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn file_extension(&self) -> &'static str {
        if self.is_json() {
            "json"
        } else {
            "html"
        }
    }
}

pub fn serialize_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Into::into)
}

/// JSON schemas of every type that crosses a process boundary.
pub fn wire_schemas() -> Result<serde_json::Value> {
    Ok(serde_json::json!({
        "schema_version": SCHEMA_VERSION,
        "generate_request": serde_json::to_value(schemars::schema_for!(GenerateRequest))?,
        "backend_request": serde_json::to_value(schemars::schema_for!(BackendRequest))?,
        "query": serde_json::to_value(schemars::schema_for!(Query))?,
        "candidate": serde_json::to_value(schemars::schema_for!(Candidate))?,
        "context_option": serde_json::to_value(schemars::schema_for!(ContextOption))?,
        "error": serde_json::to_value(schemars::schema_for!(ErrorBody))?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn blank_query_is_empty() {
        let query = Query {
            primary_name: "   ".to_string(),
            secondary_name: Some(String::new()),
            language: "en".to_string(),
            organization_id: None,
        };
        assert!(query.is_empty());
        assert!(!Query::new("Harry").is_empty());
        assert!(!Query::default().with_organization_id("17").is_empty());
        assert!(!Query::default().with_secondary_name("Spurs").is_empty());
    }

    #[test]
    fn language_falls_back_when_blank() {
        let query = Query::new("Harry");
        assert_eq!(query.language_or(DEFAULT_LANGUAGE), "en");
        assert_eq!(query.with_language("French").language_or("en"), "French");
    }

    #[test]
    fn context_key_uses_pipe_form() {
        let key: ContextKey = "52186|17".parse().unwrap();
        assert_eq!(key, ContextKey::new("52186", "17"));
        assert_eq!(key.to_string(), "52186|17");

        let empty: ContextKey = "|".parse().unwrap();
        assert_eq!(empty, ContextKey::default());

        assert!("52186".parse::<ContextKey>().is_err());
    }

    #[test]
    fn candidate_serializes_camel_case() {
        let candidate = Candidate {
            id: "231".to_string(),
            display_name: "Harry Kane".to_string(),
            organization_name: "Bayern".to_string(),
            organization_id: None,
            country_name: String::new(),
            role_label: "-".to_string(),
        };
        let value = serde_json::to_value(&candidate).unwrap();
        assert_eq!(value["displayName"], "Harry Kane");
        assert_eq!(value["organizationName"], "Bayern");
        assert!(value.get("organizationId").is_none());
    }

    #[test]
    fn schemas_cover_wire_types() {
        let schemas = wire_schemas().unwrap();
        assert_eq!(schemas["schema_version"], SCHEMA_VERSION);
        assert!(schemas["generate_request"].is_object());
        assert!(schemas["candidate"].is_object());
    }
}
