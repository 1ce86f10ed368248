use scout_protocol::{BackendQuery, BackendRequest, ContextOption, Query};

use crate::error::{PipelineError, Result};
use crate::session::{Phase, ResolutionState};

pub const DEFAULT_CAMPAIGN: &str = "Latest Campaign";

/// Builds backend payloads; no I/O.
#[derive(Debug, Clone)]
pub struct ReportRequestBuilder {
    default_language: String,
}

impl Default for ReportRequestBuilder {
    fn default() -> Self {
        Self::new(scout_protocol::DEFAULT_LANGUAGE)
    }
}

impl ReportRequestBuilder {
    pub fn new(default_language: impl Into<String>) -> Self {
        Self {
            default_language: default_language.into(),
        }
    }

    fn language(&self, query: &Query) -> String {
        query.language_or(&self.default_language).to_string()
    }

    /// First round: identify the entity by name, or by organization id when no name is given.
    pub fn disambiguation(&self, query: &Query) -> BackendRequest {
        let player = query
            .primary_name()
            .or_else(|| query.organization_id())
            .unwrap_or_default();
        BackendRequest {
            query: BackendQuery {
                player: player.to_string(),
                club: query.secondary_name().unwrap_or_default().to_string(),
                lang: self.language(query),
                season_id: None,
                tournament_id: None,
                campaign_name: None,
            },
        }
    }

    /// Final round for the selected candidate and its staged season.
    pub fn final_round(&self, state: &ResolutionState) -> Result<BackendRequest> {
        let Some(candidate) = state.selected_candidate.as_ref() else {
            return Err(PipelineError::InvalidTransition {
                operation: "generate_report",
                phase: Phase::AwaitingCandidateSelection,
            });
        };
        Ok(self.final_for(
            &candidate.id,
            &state.query,
            state.selected_context.as_ref(),
        ))
    }

    /// Final round for an already resolved entity id.
    pub fn final_for(
        &self,
        entity_id: &str,
        query: &Query,
        context: Option<&ContextOption>,
    ) -> BackendRequest {
        BackendRequest {
            query: BackendQuery {
                player: entity_id.to_string(),
                club: String::new(),
                lang: self.language(query),
                season_id: Some(context.map(|c| c.season_id.clone()).unwrap_or_default()),
                tournament_id: Some(context.map(|c| c.tournament_id.clone()).unwrap_or_default()),
                campaign_name: Some(
                    context
                        .map(|c| c.label.clone())
                        .unwrap_or_else(|| DEFAULT_CAMPAIGN.to_string()),
                ),
            },
        }
    }
}
