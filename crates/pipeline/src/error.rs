use std::time::Duration;
use thiserror::Error;

use crate::session::Phase;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Which external collaborator a failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Backend,
    Metadata,
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Backend => f.write_str("resolution backend"),
            Self::Metadata => f.write_str("metadata service"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    Candidate,
    Context,
}

impl std::fmt::Display for SelectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Candidate => f.write_str("candidate"),
            Self::Context => f.write_str("context"),
        }
    }
}

/// Errors that can occur while resolving a query into a report
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Neither a name, a secondary name nor an organization id was given
    #[error("Query needs a name, a secondary name or an organization id")]
    InvalidQuery,

    #[error("{service} did not answer within {}s", .after.as_secs_f32())]
    Timeout { service: Service, after: Duration },

    #[error("{service} request failed{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Transport {
        service: Service,
        status: Option<u16>,
        message: String,
    },

    /// The backend answered with a structured `{"error": ...}` object
    #[error("Backend reported: {0}")]
    BackendReported(String),

    #[error("Unknown {kind} selection: {id}")]
    UnknownSelection { kind: SelectionKind, id: String },

    #[error("{operation} is not allowed while {phase}")]
    InvalidTransition {
        operation: &'static str,
        phase: Phase,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn transport(service: Service, message: impl Into<String>) -> Self {
        Self::Transport {
            service,
            status: None,
            message: message.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Timeouts and transport failures may succeed when replayed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Transport { .. })
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidQuery => "invalid_query",
            Self::Timeout { .. } => "timeout",
            Self::Transport { .. } => "transport_failure",
            Self::BackendReported(_) => "backend_error",
            Self::UnknownSelection { .. } => "unknown_selection",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Config(_) => "invalid_config",
        }
    }

    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidQuery => Some("Provide player_name, club_name or a team id."),
            Self::Timeout { .. } => Some("The backend may still be scraping; retry the request."),
            Self::Transport { .. } => Some("Check that the backend URL is reachable and retry."),
            Self::UnknownSelection { .. } => {
                Some("Pick one of the ids returned by the previous step.")
            }
            Self::Config(_) => Some("Set SCOUT_BACKEND_URL or pass --backend-url."),
            Self::BackendReported(_) | Self::InvalidTransition { .. } => None,
        }
    }

    pub fn envelope(&self) -> scout_protocol::ErrorEnvelope {
        scout_protocol::ErrorEnvelope {
            code: self.code().to_string(),
            message: self.to_string(),
            retryable: self.is_retryable(),
            hint: self.hint().map(str::to_string),
        }
    }
}
