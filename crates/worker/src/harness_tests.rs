// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::adapter::RepoConfig;
use crate::test_support::{test_event, TestState};
use airlift_core::{EventData, EventType, OutboundEventType, RuntimeOptions};
use airlift_wire::WorkerInput;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct ExtractionTask {
    items: usize,
    sleep: Option<Duration>,
    fail: bool,
}

#[async_trait]
impl WorkerTask<TestState> for ExtractionTask {
    async fn execute(&self, adapter: Arc<Adapter<TestState>>) -> Result<(), TaskError> {
        if let Some(total) = self.sleep {
            // Cooperative long-running phase: bail out once timeout lands.
            let started = std::time::Instant::now();
            while started.elapsed() < total {
                tokio::time::sleep(Duration::from_millis(10)).await;
                if adapter.is_timeout() {
                    return Ok(());
                }
            }
        }
        if self.fail {
            return Err("connector blew up".into());
        }
        adapter.initialize_repos(vec![RepoConfig::new("issues").with_batch_size(1000)]);
        let items: Vec<_> = (0..self.items).map(|i| json!({"id": i})).collect();
        adapter.get_repo("issues").ok_or("missing repo")?.push(items).await?;
        adapter.emit(OutboundEventType::DataExtractionDone, None).await;
        Ok(())
    }

    async fn on_timeout(&self, adapter: Arc<Adapter<TestState>>) {
        let data = EventData { progress: Some(50), ..EventData::default() };
        adapter.emit(OutboundEventType::DataExtractionProgress, Some(data)).await;
    }
}

async fn mount_platform(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/state.get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "state": serde_json::json!({"connector": {}}).to_string(),
        })))
        .mount(server)
        .await;
    crate::test_support::mount_control_plane(server).await;
    crate::test_support::mount_artifact_store(server).await;
}

fn fast_options() -> RuntimeOptions {
    RuntimeOptions {
        retry_attempts: 2,
        retry_base_delay_ms: 1,
        retry_max_delay_ms: 5,
        ..RuntimeOptions::default()
    }
}

/// Run the harness over in-memory pipes, returning the exit and the
/// frames the worker wrote.
async fn drive(
    task: Arc<dyn WorkerTask<TestState>>,
    input: Option<WorkerInput>,
    exit_after: Option<Duration>,
) -> (WorkerExit, Vec<airlift_wire::WorkerMessage>) {
    let (worker_stdin_read, mut worker_stdin_write) = tokio::io::simplex(64 * 1024);
    let (mut worker_stdout_read, worker_stdout_write) = tokio::io::simplex(64 * 1024);

    let frames = tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Ok(Some(message)) =
            airlift_wire::read_frame::<_, airlift_wire::WorkerMessage>(&mut worker_stdout_read)
                .await
        {
            seen.push(message);
        }
        seen
    });

    if let Some(input) = &input {
        airlift_wire::write_frame(&mut worker_stdin_write, input).await.unwrap();
    }
    let feeder = tokio::spawn(async move {
        if let Some(delay) = exit_after {
            tokio::time::sleep(delay).await;
            let _ = airlift_wire::write_frame(
                &mut worker_stdin_write,
                &airlift_wire::ParentMessage::Exit,
            )
            .await;
        }
        // Keep the write end open until the harness is done reading.
        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(worker_stdin_write);
    });

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let exit = run_with_io(
        task,
        worker_stdin_read,
        worker_stdout_write,
        tx,
        rx,
        crate::logging::LogContext::default(),
    )
    .await;
    feeder.abort();

    let seen = frames.await.unwrap_or_default();
    (exit, seen)
}

fn worker_input(server: &MockServer, event_type: EventType) -> WorkerInput {
    WorkerInput {
        event: test_event(event_type, &server.uri()),
        options: fast_options(),
    }
}

#[tokio::test]
async fn happy_path_emits_done_and_exits_clean() {
    let server = MockServer::start().await;
    mount_platform(&server).await;

    let task = Arc::new(ExtractionTask { items: 5, sleep: None, fail: false });
    let input = worker_input(&server, EventType::StartExtractingData);
    let (exit, frames) = drive(task, Some(input), None).await;

    assert_eq!(exit, WorkerExit::Clean);
    assert!(frames.iter().any(|m| matches!(
        m,
        airlift_wire::WorkerMessage::Emitted {
            event_type: OutboundEventType::DataExtractionDone
        }
    )));
    assert!(frames.iter().any(|m| matches!(m, airlift_wire::WorkerMessage::Done)));

    let requests = server.received_requests().await.unwrap();
    let callbacks = requests.iter().filter(|r| r.url.path() == "/cb").count();
    assert_eq!(callbacks, 1);
}

#[tokio::test]
async fn parent_exit_drains_into_on_timeout() {
    let server = MockServer::start().await;
    mount_platform(&server).await;

    let task = Arc::new(ExtractionTask {
        items: 0,
        sleep: Some(Duration::from_millis(300)),
        fail: false,
    });
    let input = worker_input(&server, EventType::StartExtractingData);
    let (exit, frames) =
        drive(task, Some(input), Some(Duration::from_millis(30))).await;

    assert_eq!(exit, WorkerExit::Clean);
    assert!(frames.iter().any(|m| matches!(
        m,
        airlift_wire::WorkerMessage::Emitted {
            event_type: OutboundEventType::DataExtractionProgress
        }
    )));

    let requests = server.received_requests().await.unwrap();
    let callbacks: Vec<_> = requests.iter().filter(|r| r.url.path() == "/cb").collect();
    assert_eq!(callbacks.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&callbacks[0].body).unwrap();
    assert_eq!(body["event_type"], "DataExtractionProgress");
    assert_eq!(body["event_data"]["progress"], 50);
}

#[tokio::test]
async fn task_error_exits_fault_without_emitting() {
    let server = MockServer::start().await;
    mount_platform(&server).await;

    let task = Arc::new(ExtractionTask { items: 0, sleep: None, fail: true });
    let input = worker_input(&server, EventType::StartExtractingData);
    let (exit, frames) = drive(task, Some(input), None).await;

    assert_eq!(exit, WorkerExit::Fault);
    assert!(!frames.iter().any(|m| matches!(m, airlift_wire::WorkerMessage::Emitted { .. })));

    let requests = server.received_requests().await.unwrap();
    assert!(!requests.iter().any(|r| r.url.path() == "/cb"));
}

#[tokio::test]
async fn missing_input_frame_is_fatal() {
    let task = Arc::new(ExtractionTask { items: 0, sleep: None, fail: false });
    let (exit, _frames) = drive(task, None, Some(Duration::from_millis(1))).await;
    assert_eq!(exit, WorkerExit::Fault);
}

#[tokio::test]
async fn state_load_failure_is_fatal_before_task_start() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/state.get"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let task = Arc::new(ExtractionTask { items: 1, sleep: None, fail: false });
    let input = worker_input(&server, EventType::StartExtractingData);
    let (exit, _frames) = drive(task, Some(input), None).await;

    assert_eq!(exit, WorkerExit::Fault);
    let requests = server.received_requests().await.unwrap();
    assert!(!requests.iter().any(|r| r.url.path() == "/cb"));
}

#[tokio::test]
async fn stateless_event_skips_state_load() {
    let server = MockServer::start().await;
    crate::test_support::mount_control_plane(&server).await;

    struct SyncUnitsTask;
    #[async_trait]
    impl WorkerTask<TestState> for SyncUnitsTask {
        async fn execute(&self, adapter: Arc<Adapter<TestState>>) -> Result<(), TaskError> {
            adapter
                .emit(OutboundEventType::ExternalSyncUnitExtractionDone, None)
                .await;
            Ok(())
        }
        async fn on_timeout(&self, _adapter: Arc<Adapter<TestState>>) {}
    }

    let input = worker_input(&server, EventType::StartExtractingExternalSyncUnits);
    let (exit, _frames) = drive(Arc::new(SyncUnitsTask), Some(input), None).await;

    assert_eq!(exit, WorkerExit::Clean);
    let requests = server.received_requests().await.unwrap();
    assert!(!requests.iter().any(|r| r.url.path() == "/state.get"));
    assert!(requests.iter().any(|r| r.url.path() == "/cb"));
}

#[tokio::test]
async fn size_threshold_terminates_via_progress_event() {
    let server = MockServer::start().await;
    mount_platform(&server).await;

    // Enough items that batches flush during the push, crossing the
    // threshold before the task's own done emission.
    let task = Arc::new(ExtractionTask { items: 2500, sleep: None, fail: false });
    let mut input = worker_input(&server, EventType::StartExtractingData);
    // Any single artifact's metadata crosses this ceiling.
    input.options.event_size_limit = 40;
    let (exit, _frames) = drive(task, Some(input), None).await;

    assert_eq!(exit, WorkerExit::Clean);
    let requests = server.received_requests().await.unwrap();
    let callbacks: Vec<_> = requests.iter().filter(|r| r.url.path() == "/cb").collect();
    assert_eq!(callbacks.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&callbacks[0].body).unwrap();
    assert_eq!(body["event_type"], "DataExtractionProgress");
}

#[test]
fn plain_task_errors_flatten_to_message() {
    let error: TaskError = "plain failure".into();
    let described = describe_task_error(&error);
    assert_eq!(described["message"], "plain failure");
}
