use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Url};
use scout_protocol::BackendRequest;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result, Service};

/// Raw reply from the resolution backend, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendReply {
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// The service that turns a query into candidates or a report.
#[async_trait]
pub trait ResolutionBackend: Send + Sync {
    async fn submit(&self, request: &BackendRequest) -> Result<BackendReply>;
}

/// The service listing an entity's seasons.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn seasons(&self, entity_id: &str) -> Result<Value>;
}

/// Run `call` under a deadline, mapping expiry to [`PipelineError::Timeout`].
pub async fn with_deadline<T>(
    service: Service,
    deadline: Duration,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(PipelineError::Timeout {
            service,
            after: deadline,
        }),
    }
}

fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(concat!("scout/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|err| PipelineError::config(format!("failed to build HTTP client: {err}")))
}

fn transport_error(service: Service, err: reqwest::Error) -> PipelineError {
    PipelineError::Transport {
        service,
        status: err.status().map(|s| s.as_u16()),
        message: err.to_string(),
    }
}

fn status_error(service: Service, status: reqwest::StatusCode) -> PipelineError {
    PipelineError::Transport {
        service,
        status: Some(status.as_u16()),
        message: status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct HttpResolutionBackend {
    client: Client,
    url: Url,
    headers: HeaderMap,
}

impl HttpResolutionBackend {
    pub fn new(url: &str, extra_headers: &[(String, String)]) -> Result<Self> {
        let url = Url::parse(url.trim())
            .map_err(|err| PipelineError::config(format!("backend_url {url:?}: {err}")))?;
        let mut headers = HeaderMap::new();
        for (name, value) in extra_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| PipelineError::config(format!("header name {name:?}: {err}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|err| PipelineError::config(format!("header {name}: {err}")))?;
            headers.insert(name, value);
        }
        Ok(Self {
            client: build_client()?,
            url,
            headers,
        })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let headers: Vec<(String, String)> = config
            .extra_headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self::new(&config.backend_url, &headers)
    }
}

#[async_trait]
impl ResolutionBackend for HttpResolutionBackend {
    async fn submit(&self, request: &BackendRequest) -> Result<BackendReply> {
        log::debug!(
            "POST {} player={:?} club={:?} lang={} final={}",
            self.url,
            request.query.player,
            request.query.club,
            request.query.lang,
            request.query.is_final_round()
        );
        let response = self
            .client
            .post(self.url.clone())
            .headers(self.headers.clone())
            .json(request)
            .send()
            .await
            .map_err(|err| transport_error(Service::Backend, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(Service::Backend, status));
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|err| transport_error(Service::Backend, err))?;
        log::debug!(
            "Backend replied {} bytes ({})",
            body.len(),
            content_type.as_deref().unwrap_or("no content-type")
        );
        Ok(BackendReply {
            content_type,
            body: body.to_vec(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct HttpMetadataSource {
    client: Client,
    base: Url,
}

impl HttpMetadataSource {
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url.trim())
            .map_err(|err| PipelineError::config(format!("metadata_base_url {base_url:?}: {err}")))?;
        if base.cannot_be_a_base() {
            return Err(PipelineError::config(format!(
                "metadata_base_url {base_url:?} cannot carry a path"
            )));
        }
        Ok(Self {
            client: build_client()?,
            base,
        })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Self::new(&config.metadata_base_url)
    }

    /// `<base>/player/<id>/statistics/seasons`, id encoded as one segment.
    pub fn seasons_url(&self, entity_id: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["player", entity_id, "statistics", "seasons"]);
        }
        url
    }
}

#[async_trait]
impl MetadataSource for HttpMetadataSource {
    async fn seasons(&self, entity_id: &str) -> Result<Value> {
        let url = self.seasons_url(entity_id);
        log::debug!("GET {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| transport_error(Service::Metadata, err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(Service::Metadata, status));
        }
        response
            .json::<Value>()
            .await
            .map_err(|err| transport_error(Service::Metadata, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seasons_url_encodes_entity_id() {
        let source = HttpMetadataSource::new("https://api.example.org/api/v1/").unwrap();
        assert_eq!(
            source.seasons_url("231").as_str(),
            "https://api.example.org/api/v1/player/231/statistics/seasons"
        );
        assert_eq!(
            source.seasons_url("a/b c").as_str(),
            "https://api.example.org/api/v1/player/a%2Fb%20c/statistics/seasons"
        );
    }

    #[test]
    fn invalid_header_is_config_error() {
        let err = HttpResolutionBackend::new(
            "http://localhost:5678/webhook",
            &[("bad header".to_string(), "1".to_string())],
        )
        .unwrap_err();
        assert_eq!(err.code(), "invalid_config");
    }

    #[tokio::test]
    async fn deadline_expiry_is_timeout() {
        let err = with_deadline(Service::Backend, Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Timeout {
                service: Service::Backend,
                ..
            }
        ));
    }
}
