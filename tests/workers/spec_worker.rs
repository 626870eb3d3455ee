// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario worker spawned by the workspace specs.
//!
//! `SPEC_WORKER_MODE` selects the connector behavior under test.

use airlift_core::{EventData, OutboundEventType};
use airlift_worker::{
    run, Adapter, AttachmentStream, ItemLoader, ItemTypeToLoad, LoadItemResult, MapperRecord,
    RepoConfig, StreamAttachmentsArgs, StreamFn, TaskError, WorkerTask,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct SpecTask {
    mode: String,
}

#[async_trait]
impl WorkerTask<Value> for SpecTask {
    async fn execute(&self, adapter: Arc<Adapter<Value>>) -> Result<(), TaskError> {
        match self.mode.as_str() {
            "extract" => extract(&adapter).await,
            "sleep" => cooperative_sleep(&adapter).await,
            "alloc" => allocate_forever(),
            "load" => load(&adapter).await,
            "attachments" => attachments(&adapter).await,
            other => Err(format!("unknown spec worker mode: {other}").into()),
        }
    }

    async fn on_timeout(&self, adapter: Arc<Adapter<Value>>) {
        let (event, data) = match self.mode.as_str() {
            "attachments" => (
                OutboundEventType::AttachmentExtractionProgress,
                EventData { progress: Some(50), ..EventData::default() },
            ),
            "load" => (
                OutboundEventType::DataLoadingProgress,
                EventData { progress: Some(50), ..EventData::default() },
            ),
            _ => (
                OutboundEventType::DataExtractionProgress,
                EventData { progress: Some(50), ..EventData::default() },
            ),
        };
        adapter.emit(event, Some(data)).await;
    }
}

async fn extract(adapter: &Adapter<Value>) -> Result<(), TaskError> {
    adapter.initialize_repos(vec![RepoConfig::new("issues").with_batch_size(1000)]);
    let repo = adapter.get_repo("issues").ok_or("issues repo missing")?;
    let items: Vec<Value> = (0..2500).map(|i| json!({"id": i, "kind": "issue"})).collect();
    repo.push(items).await?;
    adapter.emit(OutboundEventType::DataExtractionDone, None).await;
    Ok(())
}

async fn cooperative_sleep(adapter: &Adapter<Value>) -> Result<(), TaskError> {
    let started = std::time::Instant::now();
    while started.elapsed() < Duration::from_secs(5) {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if adapter.is_timeout() {
            return Ok(());
        }
    }
    adapter.emit(OutboundEventType::DataExtractionDone, None).await;
    Ok(())
}

fn allocate_forever() -> Result<(), TaskError> {
    // Grow address space until the rlimit trips the allocator.
    let mut hoard: Vec<Vec<u8>> = Vec::new();
    loop {
        hoard.push(vec![0u8; 64 * 1024 * 1024]);
    }
}

struct DelayingLoader {
    delay_at: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl ItemLoader for DelayingLoader {
    async fn create(&self, _item: &Value) -> LoadItemResult {
        LoadItemResult { id: Some("ext-new".to_string()), ..LoadItemResult::default() }
    }

    async fn update(&self, _item: &Value, _mapper: &MapperRecord) -> LoadItemResult {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.delay_at {
            return LoadItemResult { delay: Some(30), ..LoadItemResult::default() };
        }
        LoadItemResult::default()
    }
}

async fn load(adapter: &Adapter<Value>) -> Result<(), TaskError> {
    let loader = Arc::new(DelayingLoader { delay_at: 3, calls: AtomicUsize::new(0) });
    let item_types = [ItemTypeToLoad { item_type: "issues".to_string(), loader }];
    let outcome = adapter.load_item_types(&item_types).await;

    let data = EventData {
        reports: Some(outcome.reports.clone()),
        processed_files: Some(outcome.processed_files.clone()),
        delay: outcome.delay,
        ..EventData::default()
    };
    match outcome.delay {
        Some(_) => adapter.emit(OutboundEventType::DataLoadingDelayed, Some(data)).await,
        None => adapter.emit(OutboundEventType::DataLoadingDone, Some(data)).await,
    }
    Ok(())
}

fn http_stream() -> StreamFn {
    Arc::new(|attachment| {
        Box::pin(async move {
            let response = reqwest::get(&attachment.url).await?;
            Ok(AttachmentStream { response: Some(response), ..AttachmentStream::default() })
        })
    })
}

async fn attachments(adapter: &Adapter<Value>) -> Result<(), TaskError> {
    let outcome = adapter.stream_attachments(StreamAttachmentsArgs::new(http_stream())).await;
    match outcome.delay {
        Some(delay) => {
            adapter
                .emit(
                    OutboundEventType::AttachmentExtractionDelayed,
                    Some(EventData::from_delay(delay)),
                )
                .await
        }
        None => adapter.emit(OutboundEventType::AttachmentExtractionDone, None).await,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let mode = std::env::var("SPEC_WORKER_MODE").unwrap_or_else(|_| "extract".to_string());
    run(Arc::new(SpecTask { mode })).await
}
