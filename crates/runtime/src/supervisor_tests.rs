// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use airlift_core::{EventContext, ExecutionMetadata};
use airlift_wire::encode;
use std::io::Write;
use std::time::Instant;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_event(event_type: EventType, server_uri: &str) -> AirdropEvent {
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

fn fast_options() -> RuntimeOptions {
    RuntimeOptions {
        retry_attempts: 2,
        retry_base_delay_ms: 1,
        retry_max_delay_ms: 5,
        grace_period_ms: 200,
        ..RuntimeOptions::default()
    }
}

/// A scripted worker: `sh` replays pre-encoded frames on stdout, then
/// runs the trailing script. The rlimit is skipped so the shell runs
/// unconstrained.
fn scripted_worker(
    dir: &tempfile::TempDir,
    frames: &[WorkerMessage],
    trailer: &str,
) -> WorkerSpawnConfig {
    let frame_path = dir.path().join("frames.bin");
    let mut file = std::fs::File::create(&frame_path).unwrap();
    for frame in frames {
        file.write_all(&encode(frame).unwrap()).unwrap();
    }
    drop(file);

    let script = format!("cat {}; {}", frame_path.display(), trailer);
    WorkerSpawnConfig {
        worker_path: "/bin/sh".into(),
        args: vec!["-c".to_string(), script],
        env: Vec::new(),
        worker_heap_size_mb: 512,
        apply_memory_limit: false,
    }
}

async fn mount_callback(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/cb"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

async fn callback_bodies(server: &MockServer) -> Vec<serde_json::Value> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/cb")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

#[tokio::test]
async fn emitted_worker_gets_no_synthesized_event() {
    let server = MockServer::start().await;
    mount_callback(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let config = scripted_worker(
        &dir,
        &[
            WorkerMessage::Emitted { event_type: OutboundEventType::DataExtractionDone },
            WorkerMessage::Done,
        ],
        "exit 0",
    );

    let outcome = run_worker(
        test_event(EventType::StartExtractingData, &server.uri()),
        fast_options(),
        config,
    )
    .await
    .unwrap();

    assert_eq!(outcome.emitted, Some(OutboundEventType::DataExtractionDone));
    assert_eq!(outcome.synthesized, None);
    assert_eq!(outcome.termination, WorkerTermination::Exited(0));
    assert!(callback_bodies(&server).await.is_empty());
}

#[tokio::test]
async fn crashed_worker_synthesizes_the_fault_event() {
    let server = MockServer::start().await;
    mount_callback(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let config = scripted_worker(&dir, &[], "exit 7");

    let outcome = run_worker(
        test_event(EventType::StartExtractingData, &server.uri()),
        fast_options(),
        config,
    )
    .await
    .unwrap();

    assert_eq!(outcome.emitted, None);
    assert_eq!(outcome.synthesized, Some(OutboundEventType::DataExtractionError));
    assert_eq!(outcome.termination, WorkerTermination::Exited(7));

    let bodies = callback_bodies(&server).await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["event_type"], "DataExtractionError");
    assert_eq!(bodies[0]["event_data"]["error"]["message"], "Worker exited the process");
}

#[tokio::test]
async fn oom_stderr_classifies_as_memory_fault() {
    let server = MockServer::start().await;
    mount_callback(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let config = scripted_worker(
        &dir,
        &[],
        "echo 'memory allocation of 1048576 bytes failed' >&2; exit 134",
    );

    let outcome = run_worker(
        test_event(EventType::StartExtractingAttachments, &server.uri()),
        fast_options(),
        config,
    )
    .await
    .unwrap();

    assert_eq!(outcome.synthesized, Some(OutboundEventType::AttachmentExtractionError));
    let bodies = callback_bodies(&server).await;
    let message = bodies[0]["event_data"]["error"]["message"].as_str().unwrap();
    assert!(message.contains("memory"));
}

#[tokio::test]
async fn fault_table_routes_by_incoming_event() {
    let cases = [
        (EventType::StartExtractingMetadata, "MetadataExtractionError"),
        (EventType::StartLoadingData, "DataLoadingError"),
        (EventType::StartLoadingAttachments, "AttachmentLoadingError"),
    ];

    for (incoming, expected) in cases {
        let server = MockServer::start().await;
        mount_callback(&server).await;
        let dir = tempfile::tempdir().unwrap();
        let config = scripted_worker(&dir, &[], "exit 1");

        run_worker(test_event(incoming, &server.uri()), fast_options(), config)
            .await
            .unwrap();

        let bodies = callback_bodies(&server).await;
        assert_eq!(bodies[0]["event_type"], expected, "incoming {incoming}");
    }
}

#[tokio::test]
async fn deadline_signals_then_kills_a_stuck_worker() {
    let server = MockServer::start().await;
    mount_callback(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let config = scripted_worker(&dir, &[], "sleep 30");

    let options = RuntimeOptions { timeout_ms: 200, ..fast_options() };
    let started = Instant::now();
    let outcome = run_worker(
        test_event(EventType::StartExtractingData, &server.uri()),
        options,
        config,
    )
    .await
    .unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(outcome.termination, WorkerTermination::DeadlineKilled);
    assert_eq!(outcome.synthesized, Some(OutboundEventType::DataExtractionError));
}

#[tokio::test]
async fn unknown_event_type_never_spawns_a_worker() {
    let server = MockServer::start().await;
    mount_callback(&server).await;
    let config = WorkerSpawnConfig::new("/nonexistent/worker");

    let outcome = run_worker(
        test_event(EventType::Unknown, &server.uri()),
        fast_options(),
        config,
    )
    .await
    .unwrap();

    assert_eq!(outcome.termination, WorkerTermination::NotSpawned);
    assert_eq!(outcome.synthesized, Some(OutboundEventType::UnknownEventType));

    let bodies = callback_bodies(&server).await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["event_type"], "UnknownEventType");
}

#[tokio::test]
async fn worker_logs_are_forwarded_not_synthesized() {
    let server = MockServer::start().await;
    mount_callback(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let config = scripted_worker(
        &dir,
        &[
            WorkerMessage::Log(airlift_wire::LogFrame {
                level: airlift_wire::LogLevel::Info,
                message: "task progress".to_string(),
                fields: Default::default(),
                sdk_log: false,
            }),
            WorkerMessage::Emitted {
                event_type: OutboundEventType::MetadataExtractionDone,
            },
        ],
        "exit 0",
    );

    let outcome = run_worker(
        test_event(EventType::StartExtractingMetadata, &server.uri()),
        fast_options(),
        config,
    )
    .await
    .unwrap();

    assert_eq!(outcome.emitted, Some(OutboundEventType::MetadataExtractionDone));
    assert_eq!(outcome.synthesized, None);
}

#[tokio::test]
async fn no_script_deletion_completes_with_done() {
    let server = MockServer::start().await;
    mount_callback(&server).await;

    let outcome = run_no_script(
        test_event(EventType::StartDeletingExtractorState, &server.uri()),
        fast_options(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.synthesized, Some(OutboundEventType::ExtractorStateDeletionDone));
    let bodies = callback_bodies(&server).await;
    assert_eq!(bodies[0]["event_type"], "ExtractorStateDeletionDone");
}

#[tokio::test]
async fn no_script_non_deletion_is_a_fault() {
    let server = MockServer::start().await;
    mount_callback(&server).await;

    let outcome = run_no_script(
        test_event(EventType::StartExtractingData, &server.uri()),
        fast_options(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.synthesized, Some(OutboundEventType::DataExtractionError));
}

#[tokio::test]
async fn clean_exit_without_emission_still_produces_one_event() {
    let server = MockServer::start().await;
    mount_callback(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let config = scripted_worker(&dir, &[WorkerMessage::Done], "exit 0");

    let outcome = run_worker(
        test_event(EventType::StartExtractingData, &server.uri()),
        fast_options(),
        config,
    )
    .await
    .unwrap();

    assert_eq!(outcome.emitted, None);
    assert_eq!(outcome.synthesized, Some(OutboundEventType::DataExtractionError));
    assert_eq!(callback_bodies(&server).await.len(), 1);
}
