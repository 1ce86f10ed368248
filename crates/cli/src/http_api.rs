use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{header, Response as HttpResponse, StatusCode},
    response::Response,
    routing::{get, post},
    Router,
};
use scout_pipeline::{normalize, Orchestrator, PipelineError, ResponseShape, DEFAULT_CAMPAIGN};
use scout_protocol::{
    serialize_json, BackendRequest, ContextOption, ErrorBody, ErrorEnvelope, GenerateRequest,
    Query, ReportArtifact,
};
use std::sync::Arc;

struct ProxyState {
    orchestrator: Orchestrator,
}

/// Routes of the `/api/generate` proxy.
pub fn router(orchestrator: Orchestrator) -> Router {
    let state = Arc::new(ProxyState { orchestrator });
    Router::new()
        .route("/api/generate", post(generate))
        .route("/api/seasons/:id", get(seasons))
        .route("/health", get(health))
        .with_state(state)
}

fn status_for(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::InvalidQuery
        | PipelineError::UnknownSelection { .. }
        | PipelineError::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
        PipelineError::BackendReported(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::Transport { .. } => StatusCode::BAD_GATEWAY,
        PipelineError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        PipelineError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn respond(status: StatusCode, content_type: &str, body: Vec<u8>) -> Response {
    HttpResponse::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, "no-store")
        .body(Body::from(body))
        .unwrap_or_else(|_| {
            let mut fallback = Response::new(Body::empty());
            *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        })
}

fn json_response<T: serde::Serialize>(status: StatusCode, value: &T) -> Response {
    match serialize_json(value) {
        Ok(raw) => respond(status, ReportArtifact::JSON, raw.into_bytes()),
        Err(err) => {
            log::error!("Failed to serialize response: {err:#}");
            respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                "text/plain",
                b"serialization failed".to_vec(),
            )
        }
    }
}

pub(crate) fn error_response(status: StatusCode, envelope: ErrorEnvelope) -> Response {
    json_response(status, &ErrorBody { error: envelope })
}

fn pipeline_error(err: &PipelineError) -> Response {
    log::warn!("Proxy request failed: {err}");
    error_response(status_for(err), err.envelope())
}

/// Translate the proxy body into a backend round.
fn backend_request(
    orchestrator: &Orchestrator,
    request: GenerateRequest,
) -> Result<BackendRequest, PipelineError> {
    let query = Query {
        primary_name: request.player_name.clone(),
        secondary_name: request.club_name.clone(),
        language: request.language.clone().unwrap_or_default(),
        organization_id: None,
    };
    if !request.is_final_round() {
        if query.is_empty() {
            return Err(PipelineError::InvalidQuery);
        }
        return Ok(orchestrator.requests().disambiguation(&query));
    }

    let Some(entity_id) = query.primary_name() else {
        return Err(PipelineError::InvalidQuery);
    };
    let context = ContextOption {
        label: request
            .campaign_name
            .unwrap_or_else(|| DEFAULT_CAMPAIGN.to_string()),
        season_id: request.season_id.unwrap_or_default(),
        tournament_id: request.tournament_id.unwrap_or_default(),
        sort_year: String::new(),
    };
    Ok(orchestrator
        .requests()
        .final_for(entity_id, &query, Some(&context)))
}

async fn generate(State(state): State<Arc<ProxyState>>, body: Bytes) -> Response {
    let request: GenerateRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                ErrorEnvelope {
                    code: "invalid_request".to_string(),
                    message: format!("Request body is not a generate request: {err}"),
                    retryable: false,
                    hint: Some(
                        "Send JSON like {\"player_name\":\"Harry Kane\",\"language\":\"en\"}."
                            .to_string(),
                    ),
                },
            )
        }
    };

    let request = match backend_request(&state.orchestrator, request) {
        Ok(request) => request,
        Err(err) => return pipeline_error(&err),
    };

    match state.orchestrator.round(&request).await {
        Ok(ResponseShape::CandidateList(raw)) => json_response(StatusCode::OK, &normalize(&raw)),
        Ok(ResponseShape::ReportObject(artifact)) | Ok(ResponseShape::OpaqueDocument(artifact)) => {
            respond(StatusCode::OK, &artifact.media_type, artifact.body)
        }
        Err(err) => pipeline_error(&err),
    }
}

async fn seasons(State(state): State<Arc<ProxyState>>, Path(id): Path<String>) -> Response {
    let options = state.orchestrator.contexts().resolve(&id).await;
    json_response(StatusCode::OK, &options)
}

async fn health() -> Response {
    json_response(
        StatusCode::OK,
        &serde_json::json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
        }),
    )
}
