// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded-concurrency attachment streaming pool.
//!
//! Workers drain a shared queue cooperatively. A rate-limit response
//! parks its delay in a single slot that every worker observes and exits
//! on; per-attachment failures are logged and skipped so one bad
//! attachment never stalls the chunk.

use airlift_core::NormalizedAttachment;
use futures_util::future::join_all;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Hard bounds on pool concurrency.
pub const MIN_POOL_WORKERS: usize = 1;
pub const MAX_POOL_WORKERS: usize = 50;

/// Default number of concurrent attachment streams.
pub const DEFAULT_POOL_WORKERS: usize = 10;

#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Concurrent workers, clamped to `[1, 50]`.
    pub batch_size: usize,
    /// Log a progress line every this many completions.
    pub progress_report_interval: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_POOL_WORKERS,
            progress_report_interval: 50,
        }
    }
}

impl PoolConfig {
    pub fn workers_for(&self, queue_len: usize) -> usize {
        self.batch_size
            .clamp(MIN_POOL_WORKERS, MAX_POOL_WORKERS)
            .min(queue_len.max(1))
    }
}

/// Result of the pool run for one artifact-metadata chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolOutcome {
    /// Rate-limit ceiling observed, in seconds. Returned to the caller
    /// instead of emitting.
    pub delay: Option<u64>,
}

/// Outcome of processing a single attachment.
#[derive(Debug)]
pub enum ProcessResult {
    /// Streamed and recorded.
    Completed,
    /// No stream produced (timeout mid-flow); the pool continues.
    Skipped,
    /// Rate limited; park the delay and wind the pool down.
    Delayed(u64),
    /// Per-attachment failure; logged and skipped.
    Failed(String),
}

/// Drain `attachments` with bounded concurrency.
///
/// `skip` is consulted before dispatch so already-processed attachments
/// from a previous run are never re-streamed; `cancelled` is polled
/// between attachments so timeout lands after the in-flight one.
pub async fn stream_all<P, Fut>(
    config: &PoolConfig,
    attachments: Vec<NormalizedAttachment>,
    skip: impl Fn(&NormalizedAttachment) -> bool + Sync,
    cancelled: impl Fn() -> bool + Sync,
    process: P,
) -> PoolOutcome
where
    P: Fn(NormalizedAttachment) -> Fut + Sync,
    Fut: Future<Output = ProcessResult>,
{
    let workers = config.workers_for(attachments.len());
    let queue: Mutex<VecDeque<NormalizedAttachment>> = Mutex::new(attachments.into());
    let delay_slot: Mutex<Option<u64>> = Mutex::new(None);
    let completed = AtomicUsize::new(0);

    let worker_loops = (0..workers).map(|_| {
        let queue = &queue;
        let delay_slot = &delay_slot;
        let completed = &completed;
        let skip = &skip;
        let cancelled = &cancelled;
        let process = &process;
        async move {
            loop {
                if cancelled() || delay_slot.lock().is_some() {
                    break;
                }
                let Some(attachment) = queue.lock().pop_front() else {
                    break;
                };
                if skip(&attachment) {
                    tracing::debug!(
                        attachment_id = %attachment.id,
                        parent_id = %attachment.parent_id,
                        "attachment already processed, skipping"
                    );
                    continue;
                }

                match process(attachment.clone()).await {
                    ProcessResult::Completed => {
                        let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                        if done % config.progress_report_interval.max(1) == 0 {
                            tracing::info!(processed = done, "attachment streaming progress");
                        }
                    }
                    ProcessResult::Skipped => {}
                    ProcessResult::Delayed(seconds) => {
                        *delay_slot.lock() = Some(seconds);
                        break;
                    }
                    ProcessResult::Failed(message) => {
                        tracing::error!(
                            attachment_id = %attachment.id,
                            extension = attachment.extension().unwrap_or("unknown"),
                            error = %message,
                            "failed to stream attachment"
                        );
                    }
                }
            }
        }
    });

    join_all(worker_loops).await;
    let delay = *delay_slot.lock();
    PoolOutcome { delay }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
