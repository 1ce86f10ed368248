#![allow(dead_code)]

use async_trait::async_trait;
use scout_pipeline::{
    BackendReply, MetadataSource, Orchestrator, PipelineConfig, PipelineError, ResolutionBackend,
    Result, Service,
};
use scout_protocol::BackendRequest;
use serde_json::Value;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub enum Scripted {
    Reply(BackendReply),
    Fail(PipelineError),
    Hang,
}

pub fn json_reply(body: &str) -> Scripted {
    Scripted::Reply(BackendReply {
        content_type: Some("application/json".to_string()),
        body: body.as_bytes().to_vec(),
    })
}

pub fn html_reply(body: &str) -> Scripted {
    Scripted::Reply(BackendReply {
        content_type: Some("text/html".to_string()),
        body: body.as_bytes().to_vec(),
    })
}

/// Backend that answers from a script and records every request.
#[derive(Default)]
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<BackendRequest>>,
}

impl ScriptedBackend {
    pub fn new(script: impl IntoIterator<Item = Scripted>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<BackendRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResolutionBackend for ScriptedBackend {
    async fn submit(&self, request: &BackendRequest) -> Result<BackendReply> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Reply(reply)) => Ok(reply),
            Some(Scripted::Fail(err)) => Err(err),
            Some(Scripted::Hang) => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Err(PipelineError::transport(Service::Backend, "hung"))
            }
            None => Err(PipelineError::transport(
                Service::Backend,
                "script exhausted",
            )),
        }
    }
}

pub enum MetadataScript {
    Doc(Value),
    Fail,
    Hang,
}

pub struct FakeMetadata {
    script: MetadataScript,
    calls: AtomicUsize,
}

impl FakeMetadata {
    pub fn new(script: MetadataScript) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataSource for FakeMetadata {
    async fn seasons(&self, _entity_id: &str) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            MetadataScript::Doc(doc) => Ok(doc.clone()),
            MetadataScript::Fail => Err(PipelineError::Transport {
                service: Service::Metadata,
                status: Some(403),
                message: "Forbidden".to_string(),
            }),
            MetadataScript::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Value::Null)
            }
        }
    }
}

pub fn test_config() -> PipelineConfig {
    PipelineConfig {
        backend_url: "http://backend.invalid/webhook/boss".to_string(),
        backend_timeout_secs: 1,
        metadata_timeout_secs: 1,
        ..Default::default()
    }
}

pub fn orchestrator(backend: Arc<ScriptedBackend>, metadata: Arc<FakeMetadata>) -> Orchestrator {
    Orchestrator::new(backend, metadata, &test_config())
}

/// Serve `router` on an ephemeral local port.
pub async fn spawn_stub(router: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub");
    let addr = listener.local_addr().expect("stub addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve stub");
    });
    addr
}
