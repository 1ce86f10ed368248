use scout_protocol::{BackendRequest, Candidate, ContextKey, ContextOption, Query, ReportArtifact};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::{
    with_deadline, HttpMetadataSource, HttpResolutionBackend, MetadataSource, ResolutionBackend,
};
use crate::classifier::{classify, ResponseShape};
use crate::config::PipelineConfig;
use crate::contexts::ContextResolver;
use crate::error::{PipelineError, Result, SelectionKind, Service};
use crate::normalizer::normalize;
use crate::request::ReportRequestBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Searching,
    AwaitingCandidateSelection,
    AwaitingContextSelection,
    ReportReady,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Searching => "searching",
            Self::AwaitingCandidateSelection => "awaiting a candidate selection",
            Self::AwaitingContextSelection => "awaiting a season selection",
            Self::ReportReady => "a report is ready",
            Self::Failed => "the last search failed",
        })
    }
}

/// Working state of one search-to-report flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionState {
    pub query: Query,
    pub candidates: Vec<Candidate>,
    pub selected_candidate: Option<Candidate>,
    pub context_options: Vec<ContextOption>,
    pub selected_context: Option<ContextOption>,
}

impl ResolutionState {
    pub fn new(query: Query) -> Self {
        Self {
            query,
            candidates: Vec::new(),
            selected_candidate: None,
            context_options: Vec::new(),
            selected_context: None,
        }
    }
}

/// What a backend round produced for the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Candidates(Vec<Candidate>),
    Report(ReportArtifact),
}

/// Shared, stateless half of the pipeline: clients, deadlines, builders.
#[derive(Clone)]
pub struct Orchestrator {
    backend: Arc<dyn ResolutionBackend>,
    contexts: ContextResolver,
    requests: ReportRequestBuilder,
    backend_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        backend: Arc<dyn ResolutionBackend>,
        metadata: Arc<dyn MetadataSource>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            backend,
            contexts: ContextResolver::new(metadata, config.metadata_timeout()),
            requests: ReportRequestBuilder::new(config.default_language.clone()),
            backend_timeout: config.backend_timeout(),
        }
    }

    /// Validate `config` and wire the HTTP clients.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        let backend = HttpResolutionBackend::from_config(config)?;
        let metadata = HttpMetadataSource::from_config(config)?;
        Ok(Self::new(Arc::new(backend), Arc::new(metadata), config))
    }

    pub fn session(&self) -> Session {
        Session::new(self.clone())
    }

    pub fn contexts(&self) -> &ContextResolver {
        &self.contexts
    }

    pub fn requests(&self) -> &ReportRequestBuilder {
        &self.requests
    }

    /// One bounded backend call followed by classification.
    pub async fn round(&self, request: &BackendRequest) -> Result<ResponseShape> {
        let reply = with_deadline(
            Service::Backend,
            self.backend_timeout,
            self.backend.submit(request),
        )
        .await?;
        let shape = classify(&reply.body, reply.content_type.as_deref())?;
        log::info!(
            "Backend answered {} for player={:?}",
            shape.kind(),
            request.query.player
        );
        Ok(shape)
    }
}

/// One caller's flow. Not shared; every operation takes `&mut self`.
pub struct Session {
    orchestrator: Orchestrator,
    phase: Phase,
    state: Option<ResolutionState>,
    report: Option<ReportArtifact>,
}

impl Session {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator,
            phase: Phase::Idle,
            state: None,
            report: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> Option<&ResolutionState> {
        self.state.as_ref()
    }

    pub fn report(&self) -> Option<&ReportArtifact> {
        self.report.as_ref()
    }

    fn require(&self, operation: &'static str, allowed: &[Phase]) -> Result<()> {
        if allowed.contains(&self.phase) && self.state.is_some() {
            return Ok(());
        }
        Err(PipelineError::InvalidTransition {
            operation,
            phase: self.phase,
        })
    }

    fn state_mut(&mut self, operation: &'static str) -> Result<&mut ResolutionState> {
        let phase = self.phase;
        self.state
            .as_mut()
            .ok_or(PipelineError::InvalidTransition { operation, phase })
    }

    /// Start a new flow. Accepted in every phase; earlier state is dropped.
    pub async fn search(&mut self, query: Query) -> Result<Outcome> {
        if query.is_empty() {
            return Err(PipelineError::InvalidQuery);
        }
        let request = self.orchestrator.requests.disambiguation(&query);
        self.state = Some(ResolutionState::new(query));
        self.report = None;
        self.phase = Phase::Searching;

        match self.orchestrator.round(&request).await {
            Ok(shape) => self.absorb(shape),
            Err(err) => {
                log::warn!("Search failed: {err}");
                self.phase = Phase::Failed;
                Err(err)
            }
        }
    }

    /// Pick a candidate and list its seasons; the first season is pre-selected.
    pub async fn select_candidate(&mut self, candidate_id: &str) -> Result<&[ContextOption]> {
        self.require(
            "select_candidate",
            &[
                Phase::AwaitingCandidateSelection,
                Phase::AwaitingContextSelection,
            ],
        )?;
        let candidate = self
            .state
            .iter()
            .flat_map(|state| state.candidates.iter())
            // Records without an id cannot be looked up or reported on.
            .find(|c| !c.id.trim().is_empty() && c.id == candidate_id)
            .cloned()
            .ok_or_else(|| PipelineError::UnknownSelection {
                kind: SelectionKind::Candidate,
                id: candidate_id.to_string(),
            })?;

        let options = self.orchestrator.contexts.resolve(&candidate.id).await;
        log::info!(
            "Selected {} ({}), {} season option(s)",
            candidate.display_name,
            candidate.id,
            options.len()
        );

        self.phase = Phase::AwaitingContextSelection;
        let state = self.state_mut("select_candidate")?;
        state.selected_candidate = Some(candidate);
        state.selected_context = options.first().cloned();
        state.context_options = options;
        Ok(&state.context_options)
    }

    /// Stage a season for the next report. No I/O.
    pub fn select_context(&mut self, key: &ContextKey) -> Result<&ContextOption> {
        self.require("select_context", &[Phase::AwaitingContextSelection])?;
        let state = self.state_mut("select_context")?;
        let option = state
            .context_options
            .iter()
            .find(|o| o.matches(key))
            .cloned()
            .ok_or_else(|| PipelineError::UnknownSelection {
                kind: SelectionKind::Context,
                id: key.to_string(),
            })?;
        Ok(state.selected_context.insert(option))
    }

    /// Request the report for the staged candidate and season.
    ///
    /// On failure the staged selection is kept so the call can be replayed.
    pub async fn generate_report(&mut self) -> Result<Outcome> {
        self.require("generate_report", &[Phase::AwaitingContextSelection])?;
        let request = match self.state.as_ref() {
            Some(state) => self.orchestrator.requests.final_round(state)?,
            None => {
                return Err(PipelineError::InvalidTransition {
                    operation: "generate_report",
                    phase: self.phase,
                })
            }
        };
        self.phase = Phase::Searching;

        match self.orchestrator.round(&request).await {
            Ok(ResponseShape::CandidateList(raw)) => {
                log::warn!(
                    "Final round returned {} candidate(s) instead of a report",
                    raw.len()
                );
                self.absorb(ResponseShape::CandidateList(raw))
            }
            Ok(shape) => self.absorb(shape),
            Err(err) => {
                log::warn!("Report generation failed: {err}");
                self.phase = Phase::AwaitingContextSelection;
                Err(err)
            }
        }
    }

    /// Abandon the flow.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.state = None;
        self.report = None;
    }

    fn absorb(&mut self, shape: ResponseShape) -> Result<Outcome> {
        match shape {
            ResponseShape::CandidateList(raw) => {
                let candidates = normalize(&raw);
                self.phase = Phase::AwaitingCandidateSelection;
                let state = self.state_mut("search")?;
                state.candidates = candidates.clone();
                state.selected_candidate = None;
                state.context_options.clear();
                state.selected_context = None;
                Ok(Outcome::Candidates(candidates))
            }
            ResponseShape::ReportObject(artifact) | ResponseShape::OpaqueDocument(artifact) => {
                self.phase = Phase::ReportReady;
                self.state = None;
                self.report = Some(artifact.clone());
                Ok(Outcome::Report(artifact))
            }
        }
    }
}
