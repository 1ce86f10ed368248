use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Body POSTed to the resolution backend.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct BackendRequest {
    pub query: BackendQuery,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct BackendQuery {
    pub player: String,
    pub club: String,
    pub lang: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tournament_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_name: Option<String>,
}

impl BackendQuery {
    pub fn is_final_round(&self) -> bool {
        self.season_id.is_some() || self.tournament_id.is_some() || self.campaign_name.is_some()
    }
}

/// Body accepted by the `/api/generate` proxy route.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq, JsonSchema)]
pub struct GenerateRequest {
    #[serde(default)]
    pub player_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub club_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tournament_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_name: Option<String>,
}

impl GenerateRequest {
    /// A request carrying any season field targets a resolved entity.
    pub fn is_final_round(&self) -> bool {
        self.season_id.is_some() || self.tournament_id.is_some() || self.campaign_name.is_some()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
    pub retryable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct ErrorBody {
    pub error: ErrorEnvelope,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn disambiguation_query_omits_season_fields() {
        let request = BackendRequest {
            query: BackendQuery {
                player: "Harry".to_string(),
                club: String::new(),
                lang: "en".to_string(),
                season_id: None,
                tournament_id: None,
                campaign_name: None,
            },
        };
        assert!(!request.query.is_final_round());
        let raw = serde_json::to_string(&request).unwrap();
        assert_eq!(raw, r#"{"query":{"player":"Harry","club":"","lang":"en"}}"#);
    }

    #[test]
    fn generate_request_accepts_partial_bodies() {
        let request: GenerateRequest = serde_json::from_str(r#"{"player_name":"Kane"}"#).unwrap();
        assert_eq!(request.player_name, "Kane");
        assert!(!request.is_final_round());

        let request: GenerateRequest =
            serde_json::from_str(r#"{"player_name":"231","season_id":"","tournament_id":""}"#)
                .unwrap();
        assert!(request.is_final_round());
    }
}
