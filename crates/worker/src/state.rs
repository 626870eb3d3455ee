// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Phase-guarded access to the adapter state.
//!
//! The adapter lifecycle is `Running -> Draining -> Frozen`, one-way.
//! State mutations are allowed only in `Running`; afterwards every write
//! path becomes an observable no-op that logs a warning, so a task that
//! keeps running past its timeout cannot corrupt the persisted snapshot.

use airlift_core::state::AdapterState;
use airlift_core::Artifact;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::repo::UploadObserver;
use tokio_util::sync::CancellationToken;

/// Bounds a connector's opaque state section must satisfy.
pub trait ConnectorState:
    Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static
{
}

impl<T> ConnectorState for T where
    T: Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static
{
}

/// Adapter lifecycle phase. Transitions are one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    Draining,
    Frozen,
}

struct Shared<S> {
    state: Mutex<AdapterState<S>>,
    phase: Mutex<Phase>,
    /// Fires when the lifecycle leaves `Running`; the harness redirects
    /// the task into `on_timeout` on it.
    drain: CancellationToken,
    /// Running total of serialized artifact metadata bytes.
    metadata_bytes: AtomicUsize,
    /// Crossing this flips the worker into soft-timeout.
    soft_threshold: usize,
}

/// Cloneable handle over the single mutable state of one invocation.
pub struct StateHandle<S> {
    inner: Arc<Shared<S>>,
}

impl<S> Clone for StateHandle<S> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<S: ConnectorState> StateHandle<S> {
    pub fn new(state: AdapterState<S>, soft_threshold: usize) -> Self {
        Self {
            inner: Arc::new(Shared {
                state: Mutex::new(state),
                phase: Mutex::new(Phase::Running),
                drain: CancellationToken::new(),
                metadata_bytes: AtomicUsize::new(0),
                soft_threshold,
            }),
        }
    }

    pub fn phase(&self) -> Phase {
        *self.inner.phase.lock()
    }

    /// True once the runtime has entered timeout (soft or signaled).
    pub fn is_timeout(&self) -> bool {
        self.phase() != Phase::Running
    }

    /// Enter the draining phase. Later phases never move backwards.
    pub fn begin_draining(&self) {
        {
            let mut phase = self.inner.phase.lock();
            if *phase == Phase::Running {
                *phase = Phase::Draining;
            }
        }
        self.inner.drain.cancel();
    }

    /// Freeze the state permanently.
    pub fn freeze(&self) {
        *self.inner.phase.lock() = Phase::Frozen;
        self.inner.drain.cancel();
    }

    /// Token that fires once the lifecycle leaves `Running`.
    pub fn drain_signal(&self) -> &CancellationToken {
        &self.inner.drain
    }

    /// Snapshot of the current state.
    pub fn snapshot(&self) -> AdapterState<S> {
        self.inner.state.lock().clone()
    }

    /// Read through a closure without cloning.
    pub fn read<R>(&self, f: impl FnOnce(&AdapterState<S>) -> R) -> R {
        f(&self.inner.state.lock())
    }

    /// Mutate the state when still running. After timeout the closure runs
    /// against a discarded scratch copy, so writes are observable no-ops,
    /// and a warning names the attempted path.
    pub fn modify<R>(&self, path: &str, f: impl FnOnce(&mut AdapterState<S>) -> R) -> R {
        if self.is_timeout() {
            tracing::warn!("Attempted to modify {path} during timeout");
            let mut scratch = self.snapshot();
            return f(&mut scratch);
        }
        f(&mut self.inner.state.lock())
    }

    /// Artifact metadata bytes accumulated so far.
    pub fn metadata_bytes(&self) -> usize {
        self.inner.metadata_bytes.load(Ordering::Relaxed)
    }
}

impl<S: ConnectorState> UploadObserver for StateHandle<S> {
    fn artifact_uploaded(&self, artifact: &Artifact) {
        if artifact.item_type == "attachments" {
            self.modify("toDevRev.attachmentsMetadata.artifactIds", |state| {
                state
                    .to_devrev
                    .attachments_metadata
                    .artifact_ids
                    .push(artifact.id.clone());
            });
        }

        let size = serde_json::to_vec(artifact).map(|v| v.len()).unwrap_or(0);
        let total = self.inner.metadata_bytes.fetch_add(size, Ordering::Relaxed) + size;
        if total > self.inner.soft_threshold && !self.is_timeout() {
            tracing::warn!(
                total_bytes = total,
                threshold = self.inner.soft_threshold,
                "artifact metadata exceeds soft size threshold, entering soft timeout"
            );
            self.begin_draining();
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
