// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-item-type buffered accumulator with ordered uploads.
//!
//! Items buffer until `batch_size`, then flush to uploaded artifacts in
//! push order. Within a repository, artifact order equals push order;
//! across repositories, the adapter flushes in declared order at emit.

use crate::error::WorkerError;
use airlift_client::ArtifactsClient;
use airlift_core::Artifact;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

/// Normalization applied to each pushed item before serialization.
pub type NormalizeFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Item types that hold structural documents rather than normalized
/// records; pushes to these skip normalization entirely.
const NORMALIZATION_EXEMPT: &[&str] = &["external_domain_metadata", "ssor_attachment"];

/// Observer the adapter hands to each repository at construction; called
/// once per uploaded artifact.
pub trait UploadObserver: Send + Sync {
    fn artifact_uploaded(&self, artifact: &Artifact);
}

/// Buffered accumulator for one item type.
pub struct Repository {
    item_type: String,
    batch_size: usize,
    normalize: Option<NormalizeFn>,
    items: Mutex<Vec<Value>>,
    uploaded: Mutex<Vec<Artifact>>,
    client: ArtifactsClient,
    observer: Arc<dyn UploadObserver>,
}

impl Repository {
    pub fn new(
        item_type: impl Into<String>,
        batch_size: usize,
        normalize: Option<NormalizeFn>,
        client: ArtifactsClient,
        observer: Arc<dyn UploadObserver>,
    ) -> Self {
        Self {
            item_type: item_type.into(),
            batch_size: batch_size.max(1),
            normalize,
            items: Mutex::new(Vec::new()),
            uploaded: Mutex::new(Vec::new()),
            client,
            observer,
        }
    }

    pub fn item_type(&self) -> &str {
        &self.item_type
    }

    /// Items currently buffered and not yet flushed.
    pub fn buffered_len(&self) -> usize {
        self.items.lock().len()
    }

    /// Artifacts uploaded so far, in push order.
    pub fn uploaded_artifacts(&self) -> Vec<Artifact> {
        self.uploaded.lock().clone()
    }

    /// Drop the uploaded-artifact record after a successful emission.
    pub fn clear_uploaded(&self) {
        self.uploaded.lock().clear();
    }

    fn apply_normalize(&self, items: Vec<Value>) -> Vec<Value> {
        if NORMALIZATION_EXEMPT.contains(&self.item_type.as_str()) {
            return items;
        }
        match &self.normalize {
            Some(f) => items.iter().map(|item| f(item)).collect(),
            None => items,
        }
    }

    /// Append items and flush every full batch synchronously, awaiting
    /// each upload. Any upload error aborts the call with that error.
    pub async fn push(&self, items: Vec<Value>) -> Result<(), WorkerError> {
        let items = self.apply_normalize(items);
        self.items.lock().extend(items);

        loop {
            let batch = {
                let mut buffer = self.items.lock();
                if buffer.len() < self.batch_size {
                    break;
                }
                buffer.drain(..self.batch_size).collect::<Vec<_>>()
            };
            self.flush_batch(batch).await?;
        }
        Ok(())
    }

    /// Flush a final, possibly partial batch.
    pub async fn upload(&self) -> Result<(), WorkerError> {
        let batch = {
            let mut buffer = self.items.lock();
            std::mem::take(&mut *buffer)
        };
        if batch.is_empty() {
            return Ok(());
        }
        self.flush_batch(batch).await
    }

    async fn flush_batch(&self, batch: Vec<Value>) -> Result<(), WorkerError> {
        let artifact = self
            .client
            .upload_jsonl(&self.item_type, &batch)
            .await
            .map_err(|source| WorkerError::Upload {
                item_type: self.item_type.clone(),
                source,
            })?;

        tracing::info!(
            item_type = %self.item_type,
            artifact_id = %artifact.id,
            item_count = artifact.item_count,
            "batch uploaded"
        );

        self.uploaded.lock().push(artifact.clone());
        self.observer.artifact_uploaded(&artifact);
        Ok(())
    }
}

#[cfg(test)]
#[path = "repo_tests.rs"]
mod tests;
