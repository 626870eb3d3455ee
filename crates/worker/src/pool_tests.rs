// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use parking_lot::Mutex as PlMutex;

fn attachment(id: &str) -> NormalizedAttachment {
    NormalizedAttachment {
        id: id.to_string(),
        url: format!("http://files/{id}"),
        parent_id: "p".to_string(),
        file_name: format!("{id}.png"),
        author_id: None,
        inline: None,
    }
}

fn attachments(ids: &[&str]) -> Vec<NormalizedAttachment> {
    ids.iter().map(|id| attachment(id)).collect()
}

#[tokio::test]
async fn processes_every_queued_attachment() {
    let processed = PlMutex::new(Vec::new());
    let outcome = stream_all(
        &PoolConfig::default(),
        attachments(&["x1", "x2", "x3"]),
        |_| false,
        || false,
        |att| {
            processed.lock().push(att.id.clone());
            async { ProcessResult::Completed }
        },
    )
    .await;

    assert_eq!(outcome.delay, None);
    let mut seen = processed.into_inner();
    seen.sort();
    assert_eq!(seen, vec!["x1", "x2", "x3"]);
}

#[tokio::test]
async fn skips_already_processed_attachments() {
    let processed = PlMutex::new(Vec::new());
    stream_all(
        &PoolConfig::default(),
        attachments(&["x1", "x2", "x3"]),
        |att| att.id == "x1" || att.id == "x2",
        || false,
        |att| {
            processed.lock().push(att.id.clone());
            async { ProcessResult::Completed }
        },
    )
    .await;

    assert_eq!(processed.into_inner(), vec!["x3"]);
}

#[tokio::test]
async fn delay_parks_and_stops_the_pool() {
    let config = PoolConfig { batch_size: 1, ..PoolConfig::default() };
    let processed = PlMutex::new(0usize);
    let outcome = stream_all(
        &config,
        attachments(&["x1", "x2", "x3"]),
        |_| false,
        || false,
        |att| {
            let n = {
                let mut guard = processed.lock();
                *guard += 1;
                *guard
            };
            async move {
                if n == 1 {
                    ProcessResult::Delayed(30)
                } else {
                    ProcessResult::Completed
                }
            }
        },
    )
    .await;

    assert_eq!(outcome.delay, Some(30));
    // Only the rate-limited attachment was attempted.
    assert_eq!(*processed.lock(), 1);
}

#[tokio::test]
async fn failures_are_logged_and_skipped() {
    let outcome = stream_all(
        &PoolConfig::default(),
        attachments(&["bad", "good"]),
        |_| false,
        || false,
        |att| async move {
            if att.id == "bad" {
                ProcessResult::Failed("connection reset".to_string())
            } else {
                ProcessResult::Completed
            }
        },
    )
    .await;

    assert_eq!(outcome.delay, None);
}

#[tokio::test]
async fn cancellation_stops_dispatch() {
    let processed = PlMutex::new(0usize);
    stream_all(
        &PoolConfig::default(),
        attachments(&["x1", "x2", "x3"]),
        |_| false,
        || true,
        |_| {
            *processed.lock() += 1;
            async { ProcessResult::Completed }
        },
    )
    .await;

    assert_eq!(*processed.lock(), 0);
}

#[test]
fn worker_count_clamps() {
    let config = PoolConfig { batch_size: 500, ..PoolConfig::default() };
    assert_eq!(config.workers_for(100), 50);

    let config = PoolConfig { batch_size: 0, ..PoolConfig::default() };
    assert_eq!(config.workers_for(100), 1);

    let config = PoolConfig::default();
    assert_eq!(config.workers_for(3), 3);
    assert_eq!(config.workers_for(100), 10);
}
