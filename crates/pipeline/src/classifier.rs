use scout_protocol::ReportArtifact;
use serde_json::Value;

use crate::error::{PipelineError, Result};

/// What a backend reply turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseShape {
    /// Raw candidate records, still to be normalized
    CandidateList(Vec<Value>),
    /// A structured report, passed through as JSON
    ReportObject(ReportArtifact),
    /// Anything else: HTML, text, or JSON that failed to parse
    OpaqueDocument(ReportArtifact),
}

impl ResponseShape {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CandidateList(_) => "candidate_list",
            Self::ReportObject(_) => "report_object",
            Self::OpaqueDocument(_) => "opaque_document",
        }
    }
}

/// Decide the shape of a backend reply from its bytes.
///
/// The declared content type is only used for logging: the backend is known to
/// mislabel JSON as HTML and vice versa, so the body decides. Unparseable or
/// unrecognized payloads degrade to a document instead of failing. The only
/// error is an explicit `{"error": ...}` object.
pub fn classify(body: &[u8], declared_content_type: Option<&str>) -> Result<ResponseShape> {
    let trimmed = body.trim_ascii();
    if trimmed.is_empty() {
        log::debug!("Empty backend body (declared {declared_content_type:?})");
        return Ok(ResponseShape::OpaqueDocument(ReportArtifact::html(body)));
    }

    if !matches!(trimmed.first(), Some(b'{' | b'[')) {
        return Ok(ResponseShape::OpaqueDocument(ReportArtifact::html(body)));
    }

    let value: Value = match serde_json::from_slice(trimmed) {
        Ok(value) => value,
        Err(err) => {
            log::debug!(
                "Backend body looks like JSON but does not parse ({err}); treating as document"
            );
            return Ok(ResponseShape::OpaqueDocument(ReportArtifact::html(body)));
        }
    };

    match value {
        Value::Array(items) => Ok(ResponseShape::CandidateList(items)),
        Value::Object(mut map) => {
            if matches!(map.get("candidates"), Some(Value::Array(_))) {
                if let Some(Value::Array(items)) = map.remove("candidates") {
                    return Ok(ResponseShape::CandidateList(items));
                }
            }
            let is_stats = map.get("type").and_then(Value::as_str) == Some("stats")
                || map.contains_key("all_stats");
            if is_stats {
                return Ok(ResponseShape::ReportObject(ReportArtifact::json(body)));
            }
            if let Some(error) = map.get("error") {
                return Err(PipelineError::BackendReported(error_text(error)));
            }
            Ok(ResponseShape::ReportObject(ReportArtifact::json(body)))
        }
        // Scalars start with neither brace; unreachable after the prefix check.
        _ => Ok(ResponseShape::OpaqueDocument(ReportArtifact::html(body))),
    }
}

fn error_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
