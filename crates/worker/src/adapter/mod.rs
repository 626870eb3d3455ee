// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker adapter: the single surface a connector task operates on.
//!
//! One adapter exists per worker invocation. It owns every repository and
//! the attachment pool, mediates all state mutation, and is the only
//! component that talks back to the supervisor.

mod emitter;
mod loader;
mod stream;

pub(crate) use emitter::retry_policy_from;
pub use loader::{ItemLoader, ItemTypeToLoad, LoadItemResult, LoadOutcome};
pub use stream::{
    AttachmentStream, AttachmentsProcessor, StreamAttachmentsArgs, StreamAttachmentsOutcome,
    StreamFn,
};

use crate::error::WorkerError;
use crate::repo::{NormalizeFn, Repository, UploadObserver};
use crate::state::{ConnectorState, Phase, StateHandle};
use airlift_client::{ArtifactsClient, MappersClient, StateClient};
use airlift_core::state::AdapterState;
use airlift_core::{AirdropEvent, Artifact, RuntimeOptions};
use airlift_wire::WorkerMessage;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Declaration of one repository in `initialize_repos`.
pub struct RepoConfig {
    pub item_type: String,
    pub normalize: Option<NormalizeFn>,
    pub batch_size: Option<usize>,
}

impl RepoConfig {
    pub fn new(item_type: impl Into<String>) -> Self {
        Self { item_type: item_type.into(), normalize: None, batch_size: None }
    }

    pub fn with_normalize(mut self, normalize: NormalizeFn) -> Self {
        self.normalize = Some(normalize);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }
}

/// Channel back to the harness: outbound frames plus the exit request the
/// emitter raises on unrecoverable failures.
#[derive(Clone)]
pub struct ParentLink {
    messages: mpsc::UnboundedSender<WorkerMessage>,
    exit_requested: CancellationToken,
}

impl ParentLink {
    pub fn new(messages: mpsc::UnboundedSender<WorkerMessage>) -> Self {
        Self { messages, exit_requested: CancellationToken::new() }
    }

    pub fn send(&self, message: WorkerMessage) {
        // A closed channel means the harness is already tearing down.
        let _ = self.messages.send(message);
    }

    pub fn request_exit(&self) {
        self.exit_requested.cancel();
    }

    pub fn exit_requested(&self) -> &CancellationToken {
        &self.exit_requested
    }
}

/// The contract consumed by user tasks.
pub struct Adapter<S: ConnectorState> {
    event: AirdropEvent,
    options: RuntimeOptions,
    handle: StateHandle<S>,
    http_client: reqwest::Client,
    state_client: StateClient,
    artifacts_client: ArtifactsClient,
    mappers_client: MappersClient,
    repos: Mutex<Vec<Arc<Repository>>>,
    has_emitted: AtomicBool,
    parent: ParentLink,
}

impl<S: ConnectorState> Adapter<S> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        event: AirdropEvent,
        options: RuntimeOptions,
        initial_state: AdapterState<S>,
        http_client: reqwest::Client,
        state_client: StateClient,
        artifacts_client: ArtifactsClient,
        mappers_client: MappersClient,
        parent: ParentLink,
    ) -> Arc<Self> {
        let handle = StateHandle::new(initial_state, options.soft_size_threshold());
        Arc::new(Self {
            event,
            options,
            handle,
            http_client,
            state_client,
            artifacts_client,
            mappers_client,
            repos: Mutex::new(Vec::new()),
            has_emitted: AtomicBool::new(false),
            parent,
        })
    }

    pub fn event(&self) -> &AirdropEvent {
        &self.event
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    /// Snapshot of the current adapter state.
    pub fn state(&self) -> AdapterState<S> {
        self.handle.snapshot()
    }

    /// Mutate state. `path` names the mutated location for the warning
    /// logged when a write lands after timeout.
    pub fn modify_state<R>(&self, path: &str, f: impl FnOnce(&mut AdapterState<S>) -> R) -> R {
        self.handle.modify(path, f)
    }

    pub fn state_handle(&self) -> &StateHandle<S> {
        &self.handle
    }

    pub fn is_timeout(&self) -> bool {
        self.handle.is_timeout()
    }

    pub fn phase(&self) -> Phase {
        self.handle.phase()
    }

    /// Cooperative timeout entry: flips the lifecycle to draining. The
    /// pool, in-flight streams, and the state guard all observe this.
    pub fn handle_timeout(&self) {
        tracing::info!("timeout received, draining");
        self.handle.begin_draining();
    }

    /// Permanently freeze the state after the drain completed.
    pub fn freeze(&self) {
        self.handle.freeze();
    }

    pub fn has_emitted(&self) -> bool {
        self.has_emitted.load(Ordering::SeqCst)
    }

    pub fn parent(&self) -> &ParentLink {
        &self.parent
    }

    /// Declare the repositories this task pushes to. Order is load-bearing:
    /// the flush at emission walks repositories in this order.
    pub fn initialize_repos(&self, configs: Vec<RepoConfig>) {
        let observer: Arc<dyn UploadObserver> = Arc::new(self.handle.clone());
        let mut repos = self.repos.lock();
        for config in configs {
            if repos.iter().any(|r| r.item_type() == config.item_type) {
                tracing::warn!(item_type = %config.item_type, "repository already initialized");
                continue;
            }
            repos.push(Arc::new(Repository::new(
                config.item_type,
                config.batch_size.unwrap_or(self.options.batch_size),
                config.normalize,
                self.artifacts_client.clone(),
                Arc::clone(&observer),
            )));
        }
    }

    pub fn get_repo(&self, item_type: &str) -> Option<Arc<Repository>> {
        self.repos.lock().iter().find(|r| r.item_type() == item_type).cloned()
    }

    /// Fetch a repository, appending an implicitly declared one when the
    /// item type was never initialized (used for `ssor_attachment`).
    pub(crate) fn ensure_repo(&self, item_type: &str) -> Arc<Repository> {
        if let Some(repo) = self.get_repo(item_type) {
            return repo;
        }
        let observer: Arc<dyn UploadObserver> = Arc::new(self.handle.clone());
        let repo = Arc::new(Repository::new(
            item_type,
            self.options.batch_size,
            None,
            self.artifacts_client.clone(),
            observer,
        ));
        self.repos.lock().push(Arc::clone(&repo));
        repo
    }

    /// Flush every repository's remaining buffer, in declared order.
    ///
    /// The repository still flushes during timeout so buffered work is
    /// not lost.
    pub async fn upload_all_repos(&self) -> Result<(), WorkerError> {
        let repos: Vec<Arc<Repository>> = self.repos.lock().clone();
        for repo in repos {
            repo.upload().await?;
        }
        Ok(())
    }

    /// Uploaded artifacts across all repositories: per-repository push
    /// order, repositories in declared order.
    pub fn collect_artifacts(&self) -> Vec<Artifact> {
        self.repos
            .lock()
            .iter()
            .flat_map(|repo| repo.uploaded_artifacts())
            .collect()
    }

    pub(crate) fn clear_collected_artifacts(&self) {
        for repo in self.repos.lock().iter() {
            repo.clear_uploaded();
        }
    }

    pub(crate) fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    pub(crate) fn artifacts_client(&self) -> &ArtifactsClient {
        &self.artifacts_client
    }

    pub(crate) fn mappers_client(&self) -> &MappersClient {
        &self.mappers_client
    }

    pub(crate) fn state_client(&self) -> &StateClient {
        &self.state_client
    }
}

#[cfg(test)]
#[path = "adapter_tests.rs"]
mod tests;
