use scout_protocol::{ContextKey, ContextOption};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::{with_deadline, MetadataSource};
use crate::error::Service;

pub const FALLBACK_LABEL: &str = "Latest Available Data";
pub const FALLBACK_SORT_YEAR: &str = "Latest";
const UNKNOWN: &str = "Unknown";

/// The option offered when an entity's seasons cannot be listed.
pub fn fallback_option() -> ContextOption {
    ContextOption {
        label: FALLBACK_LABEL.to_string(),
        season_id: String::new(),
        tournament_id: String::new(),
        sort_year: FALLBACK_SORT_YEAR.to_string(),
    }
}

fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Tournament groups from either `uniqueTournamentSeasons` or every entry of `types`.
fn tournament_groups(doc: &Value) -> Vec<&Value> {
    if let Some(groups) = doc.get("uniqueTournamentSeasons").and_then(Value::as_array) {
        return groups.iter().collect();
    }
    let Some(types) = doc.get("types").and_then(Value::as_object) else {
        return Vec::new();
    };
    types
        .values()
        .filter_map(|entry| entry.get("uniqueTournamentSeasons"))
        .filter_map(Value::as_array)
        .flatten()
        .collect()
}

fn flatten_group(group: &Value, out: &mut Vec<ContextOption>) {
    let tournament = group.get("uniqueTournament");
    let tournament_name = scalar_text(tournament.and_then(|t| t.get("name")))
        .unwrap_or_else(|| UNKNOWN.to_string());
    let tournament_id = scalar_text(tournament.and_then(|t| t.get("id"))).unwrap_or_default();

    let Some(seasons) = group.get("seasons").and_then(Value::as_array) else {
        return;
    };
    for season in seasons {
        let year = scalar_text(season.get("year"));
        out.push(ContextOption {
            label: format!("{} - {}", year.as_deref().unwrap_or(UNKNOWN), tournament_name),
            season_id: scalar_text(season.get("id")).unwrap_or_default(),
            tournament_id: tournament_id.clone(),
            sort_year: year.unwrap_or_default(),
        });
    }
}

/// Flatten, order and deduplicate a metadata document. Never empty.
///
/// Ordering is descending by `sort_year` compared as plain strings, so
/// `"2105"` sorts before `"2023"` and `"23/24"` before `"2023"`. Ties keep the
/// order in which the service listed them; the first of several options with
/// the same `(season, tournament)` pair wins.
pub fn options_from_metadata(doc: &Value) -> Vec<ContextOption> {
    let mut options = Vec::new();
    for group in tournament_groups(doc) {
        flatten_group(group, &mut options);
    }

    options.sort_by(|a, b| b.sort_year.cmp(&a.sort_year));

    let mut seen: HashSet<ContextKey> = HashSet::new();
    options.retain(|option| seen.insert(option.key()));

    if options.is_empty() {
        return vec![fallback_option()];
    }
    options
}

/// Lists the seasons an entity can be reported on.
#[derive(Clone)]
pub struct ContextResolver {
    source: Arc<dyn MetadataSource>,
    deadline: Duration,
}

impl ContextResolver {
    pub fn new(source: Arc<dyn MetadataSource>, deadline: Duration) -> Self {
        Self { source, deadline }
    }

    /// Resolve the options for `entity_id`; any failure yields the fallback.
    pub async fn resolve(&self, entity_id: &str) -> Vec<ContextOption> {
        let fetched = with_deadline(
            Service::Metadata,
            self.deadline,
            self.source.seasons(entity_id),
        )
        .await;
        match fetched {
            Ok(doc) => {
                let options = options_from_metadata(&doc);
                log::debug!("Resolved {} season option(s) for {entity_id}", options.len());
                options
            }
            Err(err) => {
                log::warn!("Season lookup for {entity_id} failed, using latest data: {err}");
                vec![fallback_option()]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn labels(options: &[ContextOption]) -> Vec<&str> {
        options.iter().map(|o| o.label.as_str()).collect()
    }

    #[test]
    fn duplicate_season_collapses() {
        let doc = json!({"uniqueTournamentSeasons": [{
            "uniqueTournament": {"name": "League X", "id": "9"},
            "seasons": [{"id": "1", "year": "2022"}, {"id": "1", "year": "2022"}]
        }]});
        assert_eq!(
            options_from_metadata(&doc),
            vec![ContextOption {
                label: "2022 - League X".to_string(),
                season_id: "1".to_string(),
                tournament_id: "9".to_string(),
                sort_year: "2022".to_string(),
            }]
        );
    }

    #[test]
    fn types_wrapper_is_aggregated() {
        let doc = json!({"types": {
            "club": {"uniqueTournamentSeasons": [{
                "uniqueTournament": {"name": "Premier League", "id": 17},
                "seasons": [{"id": 52186, "year": "23/24"}, {"id": 41886, "year": "22/23"}]
            }]},
            "national": {"uniqueTournamentSeasons": [{
                "uniqueTournament": {"name": "EURO", "id": 1},
                "seasons": [{"id": 56953, "year": "2024"}]
            }]},
            "junk": {"other": true}
        }});
        let options = options_from_metadata(&doc);
        assert_eq!(
            labels(&options),
            vec!["23/24 - Premier League", "22/23 - Premier League", "2024 - EURO"]
        );
        assert_eq!(options[0].key(), ContextKey::new("52186", "17"));
    }

    #[test]
    fn top_level_list_takes_precedence_over_types() {
        let doc = json!({
            "uniqueTournamentSeasons": [{
                "uniqueTournament": {"name": "A", "id": 1},
                "seasons": [{"id": 1, "year": "2020"}]
            }],
            "types": {"club": {"uniqueTournamentSeasons": [{
                "uniqueTournament": {"name": "B", "id": 2},
                "seasons": [{"id": 2, "year": "2021"}]
            }]}}
        });
        assert_eq!(labels(&options_from_metadata(&doc)), vec!["2020 - A"]);
    }

    #[test]
    fn sort_is_lexicographic_descending() {
        let doc = json!({"uniqueTournamentSeasons": [{
            "uniqueTournament": {"name": "L", "id": 1},
            "seasons": [
                {"id": 1, "year": "2019"},
                {"id": 2, "year": "2105"},
                {"id": 3, "year": "2023"},
                {"id": 4, "year": "999"}
            ]
        }]});
        let years: Vec<String> = options_from_metadata(&doc)
            .into_iter()
            .map(|o| o.sort_year)
            .collect();
        assert_eq!(years, vec!["999", "2105", "2023", "2019"]);
    }

    #[test]
    fn ties_keep_encountered_order() {
        let doc = json!({"uniqueTournamentSeasons": [
            {"uniqueTournament": {"name": "First", "id": 1}, "seasons": [{"id": 10, "year": "2022"}]},
            {"uniqueTournament": {"name": "Second", "id": 2}, "seasons": [{"id": 20, "year": "2022"}]}
        ]});
        assert_eq!(
            labels(&options_from_metadata(&doc)),
            vec!["2022 - First", "2022 - Second"]
        );
    }

    #[test]
    fn missing_names_and_years_default() {
        let doc = json!({"uniqueTournamentSeasons": [
            {"seasons": [{"id": 5}]},
            {"uniqueTournament": {"name": "No seasons"}}
        ]});
        let options = options_from_metadata(&doc);
        assert_eq!(labels(&options), vec!["Unknown - Unknown"]);
        assert_eq!(options[0].sort_year, "");
        assert_eq!(options[0].tournament_id, "");
    }

    #[test]
    fn empty_documents_fall_back() {
        for doc in [
            json!({}),
            json!({"uniqueTournamentSeasons": []}),
            json!({"types": {}}),
            json!({"types": {"club": {"uniqueTournamentSeasons": [{"seasons": []}]}}}),
            json!("nope"),
        ] {
            assert_eq!(options_from_metadata(&doc), vec![fallback_option()]);
        }
    }
}
