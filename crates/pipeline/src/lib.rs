//! # Scout Pipeline
//!
//! Turns a free-text player query into either a list of candidates to choose
//! from or a finished scouting report.
//!
//! ## Architecture
//!
//! ```text
//! Query
//!     │
//!     ├──> ReportRequestBuilder → disambiguation payload
//!     │
//!     ├──> Resolution backend (30s deadline)
//!     │
//!     ├──> Classifier
//!     │    ├─> candidate list ──> Normalizer ──> caller picks one
//!     │    │                                        │
//!     │    │                      ContextResolver <─┘ (seasons, 10s deadline)
//!     │    │                            │
//!     │    │                      caller picks a season
//!     │    │                            │
//!     │    │       final payload ──> backend ──> Classifier ──> report
//!     │    │
//!     │    └─> report object / document ──> report
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use scout_pipeline::{Orchestrator, Outcome, PipelineConfig};
//! use scout_protocol::Query;
//!
//! # async fn run() -> scout_pipeline::Result<()> {
//! let config = PipelineConfig {
//!     backend_url: "http://127.0.0.1:5678/webhook/boss".to_string(),
//!     ..Default::default()
//! };
//! let mut session = Orchestrator::from_config(&config)?.session();
//!
//! if let Outcome::Candidates(candidates) = session.search(Query::new("Harry")).await? {
//!     let seasons = session.select_candidate(&candidates[0].id).await?;
//!     println!("defaulting to {}", seasons[0].label);
//!     let report = session.generate_report().await?;
//!     println!("{report:?}");
//! }
//! # Ok(())
//! # }
//! ```

mod backend;
mod classifier;
mod config;
mod contexts;
mod error;
mod normalizer;
mod request;
mod session;

pub use backend::{
    with_deadline, BackendReply, HttpMetadataSource, HttpResolutionBackend, MetadataSource,
    ResolutionBackend,
};
pub use classifier::{classify, ResponseShape};
pub use config::{
    PipelineConfig, BACKEND_TIMEOUT_ENV, BACKEND_URL_ENV, LANGUAGE_ENV, METADATA_TIMEOUT_ENV,
    METADATA_URL_ENV,
};
pub use contexts::{fallback_option, options_from_metadata, ContextResolver, FALLBACK_LABEL};
pub use error::{PipelineError, Result, SelectionKind, Service};
pub use normalizer::{normalize, normalize_one, UNKNOWN_NAME, UNKNOWN_ROLE, UNKNOWN_TEAM};
pub use request::{ReportRequestBuilder, DEFAULT_CAMPAIGN};
pub use session::{Orchestrator, Outcome, Phase, ResolutionState, Session};
