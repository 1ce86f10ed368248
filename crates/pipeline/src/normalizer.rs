//! Canonicalization of candidate records.
//!
//! The backend's candidate records drift between versions: the id may be
//! folded into the name (`"Harry Kane|231"`), the team may be a string, an
//! object, or nested under `entity`, and numbers show up where strings are
//! expected. Each record is decoded into a permissive shape where every field
//! has a catch-all arm, then every canonical field is resolved from an ordered
//! list of known sources with an explicit default.

use scout_protocol::Candidate;
use serde::de::IgnoredAny;
use serde::Deserialize;
use serde_json::Value;

pub const UNKNOWN_NAME: &str = "Unknown";
pub const UNKNOWN_TEAM: &str = "Unknown Team";
pub const UNKNOWN_ROLE: &str = "-";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
    Other(IgnoredAny),
}

impl Scalar {
    fn text(&self) -> Option<String> {
        match self {
            Self::Text(text) if !text.trim().is_empty() => Some(text.clone()),
            Self::Number(number) => Some(number.to_string()),
            Self::Text(_) | Self::Other(_) => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NamedRecord {
    name: Option<Scalar>,
    id: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NamedField {
    // Must precede `Record`; the derived struct visitor also accepts sequences.
    Seq(Vec<IgnoredAny>),
    Record(NamedRecord),
    Name(String),
    Other(IgnoredAny),
}

impl NamedField {
    fn record_name(&self) -> Option<String> {
        match self {
            Self::Record(record) => record.name.as_ref().and_then(Scalar::text),
            Self::Seq(_) | Self::Name(_) | Self::Other(_) => None,
        }
    }

    fn record_id(&self) -> Option<String> {
        match self {
            Self::Record(record) => record.id.as_ref().and_then(Scalar::text),
            Self::Seq(_) | Self::Name(_) | Self::Other(_) => None,
        }
    }

    fn plain_name(&self) -> Option<String> {
        match self {
            Self::Name(name) if !name.trim().is_empty() => Some(name.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EntityRecord {
    team: Option<NamedField>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EntityField {
    Seq(Vec<IgnoredAny>),
    Record(EntityRecord),
    Other(IgnoredAny),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCandidate {
    name: Option<Scalar>,
    id: Option<Scalar>,
    team: Option<NamedField>,
    #[serde(rename = "teamId")]
    team_id_camel: Option<Scalar>,
    team_id: Option<Scalar>,
    entity: Option<EntityField>,
    country: Option<NamedField>,
    position: Option<Scalar>,
}

impl RawCandidate {
    fn decode(raw: &Value) -> Self {
        if !raw.is_object() {
            return Self::default();
        }
        Self::deserialize(raw).unwrap_or_else(|err| {
            log::debug!("Candidate record did not decode ({err}); using defaults");
            Self::default()
        })
    }

    fn entity_team(&self) -> Option<&NamedField> {
        match self.entity.as_ref()? {
            EntityField::Record(entity) => entity.team.as_ref(),
            EntityField::Seq(_) | EntityField::Other(_) => None,
        }
    }
}

/// Split `"Name|Id"` on the first separator.
fn split_combined(name: &str) -> Option<(&str, &str)> {
    name.split_once('|')
        .map(|(display, id)| (display.trim(), id.trim()))
}

pub fn normalize_one(raw: &Value) -> Candidate {
    let record = RawCandidate::decode(raw);
    let raw_name = record.name.as_ref().and_then(Scalar::text);
    let raw_id = record.id.as_ref().and_then(Scalar::text);

    let combined = raw_name
        .as_deref()
        .and_then(split_combined)
        .map(|(display, id)| (display.to_string(), id.to_string()));
    let (display_name, id) = match combined {
        Some((display, id)) => (
            Some(display).filter(|d| !d.is_empty()),
            Some(id).filter(|i| !i.is_empty()).or(raw_id),
        ),
        None => (raw_name, raw_id),
    };

    let team = record.team.as_ref();
    let entity_team = record.entity_team();

    let organization_name = [
        team.and_then(NamedField::record_name),
        entity_team.and_then(NamedField::record_name),
        team.and_then(NamedField::plain_name),
    ]
    .into_iter()
    .flatten()
    .next()
    .unwrap_or_else(|| UNKNOWN_TEAM.to_string());

    let organization_id = [
        team.and_then(NamedField::record_id),
        record.team_id_camel.as_ref().and_then(Scalar::text),
        record.team_id.as_ref().and_then(Scalar::text),
        entity_team.and_then(NamedField::record_id),
    ]
    .into_iter()
    .flatten()
    .next();

    let country_name = record
        .country
        .as_ref()
        .and_then(|country| country.plain_name().or_else(|| country.record_name()))
        .unwrap_or_default();

    Candidate {
        id: id.unwrap_or_default(),
        display_name: display_name.unwrap_or_else(|| UNKNOWN_NAME.to_string()),
        organization_name,
        organization_id,
        country_name,
        role_label: record
            .position
            .as_ref()
            .and_then(Scalar::text)
            .unwrap_or_else(|| UNKNOWN_ROLE.to_string()),
    }
}

/// Normalize raw candidate records, preserving their order.
pub fn normalize(raw: &[Value]) -> Vec<Candidate> {
    raw.iter().map(normalize_one).collect()
}
