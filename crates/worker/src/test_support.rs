// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for worker tests: an adapter wired to a wiremock
//! server with fast retry policies.

use crate::adapter::{Adapter, ParentLink};
use airlift_client::{build_client, ArtifactsClient, HttpConfig, MappersClient, StateClient};
use airlift_client::RetryPolicy;
use airlift_core::state::AdapterState;
use airlift_core::{AirdropEvent, EventContext, EventType, ExecutionMetadata, RuntimeOptions};
use airlift_wire::WorkerMessage;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TestState {
    pub cursor: Option<String>,
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 2,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
    }
}

pub fn test_event(event_type: EventType, server_uri: &str) -> AirdropEvent {
    AirdropEvent {
        event_type,
        event_context: EventContext {
            callback_url: format!("{server_uri}/cb"),
            worker_data_url: format!("{server_uri}/state"),
            sync_unit: "unit-1".to_string(),
            ..EventContext::default()
        },
        execution_metadata: ExecutionMetadata {
            devrev_endpoint: server_uri.to_string(),
            devrev_token: "tok".to_string(),
        },
        payload: None,
    }
}

pub struct Fixture {
    pub server: MockServer,
    pub adapter: Arc<Adapter<TestState>>,
    pub rx: mpsc::UnboundedReceiver<WorkerMessage>,
}

pub async fn fixture(event_type: EventType) -> Fixture {
    fixture_with(event_type, RuntimeOptions::default(), AdapterState::default(), None).await
}

pub async fn fixture_with(
    event_type: EventType,
    options: RuntimeOptions,
    initial_state: AdapterState<TestState>,
    payload: Option<airlift_core::EventPayload>,
) -> Fixture {
    let server = MockServer::start().await;
    let mut event = test_event(event_type, &server.uri());
    event.payload = payload;

    let http = build_client(&HttpConfig::default()).unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    let adapter = Adapter::new(
        event,
        options,
        initial_state,
        http.clone(),
        StateClient::new(http.clone(), format!("{}/state", server.uri()), "tok")
            .with_retry(fast_retry()),
        ArtifactsClient::new(http.clone(), server.uri(), "tok").with_retry(fast_retry()),
        MappersClient::new(http, server.uri(), "tok").with_retry(fast_retry()),
        ParentLink::new(tx),
    );

    Fixture { server, adapter, rx }
}

/// Mount happy-path artifact store mocks: prepare hands out sequential
/// ids, upload and confirm accept everything.
pub async fn mount_artifact_store(server: &MockServer) {
    use std::sync::atomic::{AtomicUsize, Ordering};
    let counter = Arc::new(AtomicUsize::new(0));

    let upload_url = format!("{}/upload", server.uri());
    Mock::given(method("POST"))
        .and(path("/internal/artifacts.prepare"))
        .respond_with(move |_: &wiremock::Request| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            ResponseTemplate::new(200).set_body_json(json!({
                "artifact_id": format!("art-{n}"),
                "url": upload_url.clone(),
                "form_data": [{"key": "policy", "value": "signed"}],
            }))
        })
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(204))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/internal/artifacts.confirm_upload"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

/// Mount accepting state and callback endpoints.
pub async fn mount_control_plane(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/state.update"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cb"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}
