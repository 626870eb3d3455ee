// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loader-direction item application: walk the persisted file list,
//! resolve mappings, and apply records through connector callbacks.

use super::Adapter;
use crate::error::WorkerError;
use crate::state::ConnectorState;
use airlift_client::MapperRecord;
use airlift_core::loader::{merge_reports, FileToLoad, LoaderReport};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Outcome of applying one record in the external system.
#[derive(Debug, Clone, Default)]
pub struct LoadItemResult {
    /// External id of the created or updated object.
    pub id: Option<String>,
    /// Rate-limit ceiling in seconds; breaks the walk.
    pub delay: Option<u64>,
    /// Per-record failure; counted and skipped.
    pub error: Option<String>,
}

/// Connector callbacks that apply records to the external system.
#[async_trait]
pub trait ItemLoader: Send + Sync {
    async fn create(&self, item: &Value) -> LoadItemResult;
    async fn update(&self, item: &Value, mapper: &MapperRecord) -> LoadItemResult;
}

/// One item type the connector can load, with its callbacks.
pub struct ItemTypeToLoad {
    pub item_type: String,
    pub loader: Arc<dyn ItemLoader>,
}

/// Result of a load walk.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub reports: Vec<LoaderReport>,
    pub processed_files: Vec<String>,
    pub delay: Option<u64>,
    pub error: Option<String>,
}

impl<S: ConnectorState> Adapter<S> {
    /// Walk `fromDevRev.filesToLoad`, applying each non-completed file's
    /// records through the matching loader. Progress persists in place:
    /// `line_to_process` advances monotonically and `completed` flips
    /// exactly once per file.
    pub async fn load_item_types(&self, item_types: &[ItemTypeToLoad]) -> LoadOutcome {
        let mut outcome = LoadOutcome::default();

        if let Err(e) = self.populate_files_to_load().await {
            outcome.error = Some(e.to_string());
            return outcome;
        }

        let files: Vec<FileToLoad> =
            self.state_handle().read(|state| state.from_devrev.files_to_load.clone());

        for (index, file) in files.iter().enumerate() {
            if file.completed {
                continue;
            }
            let Some(to_load) = item_types.iter().find(|t| t.item_type == file.item_type)
            else {
                tracing::debug!(item_type = %file.item_type, "no loader for item type, skipping");
                continue;
            };

            match self.load_file(index, file, to_load, &mut outcome.reports).await {
                Ok(FileWalk::Completed) => {
                    outcome.processed_files.push(file.artifact_id.clone());
                }
                Ok(FileWalk::RateLimited(delay)) => {
                    outcome.delay = Some(delay);
                    return outcome;
                }
                Ok(FileWalk::Interrupted) => return outcome,
                Err(e) => {
                    outcome.error = Some(e.to_string());
                    return outcome;
                }
            }
        }

        outcome
    }

    /// Load attachments from the platform into the external system. The
    /// walk is the item-type walk specialized to the attachment inventory.
    pub async fn load_attachments(&self, create: Arc<dyn ItemLoader>) -> LoadOutcome {
        let item_types =
            [ItemTypeToLoad { item_type: "attachment".to_string(), loader: create }];
        self.load_item_types(&item_types).await
    }

    /// On the first load event the file inventory comes from the stats
    /// artifact named in the event payload.
    async fn populate_files_to_load(&self) -> Result<(), WorkerError> {
        let already_populated =
            self.state_handle().read(|state| !state.from_devrev.files_to_load.is_empty());
        if already_populated {
            return Ok(());
        }

        let Some(stats_artifact_id) = self
            .event()
            .payload
            .as_ref()
            .and_then(|p| p.event_data.as_ref())
            .and_then(|d| d.get("stats_file"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
        else {
            tracing::debug!("no stats artifact in event payload, nothing to load");
            return Ok(());
        };

        let stats = self.artifacts_client().fetch_json(&stats_artifact_id).await?;
        let files = parse_stats_files(&stats_artifact_id, &stats)?;

        tracing::info!(
            stats_artifact_id = %stats_artifact_id,
            file_count = files.len(),
            "file inventory loaded from stats artifact"
        );
        self.modify_state("fromDevRev.filesToLoad", |state| {
            state.from_devrev.files_to_load = files;
        });
        Ok(())
    }

    /// Apply one file's records from the current resume position.
    async fn load_file(
        &self,
        file_index: usize,
        file: &FileToLoad,
        to_load: &ItemTypeToLoad,
        reports: &mut Vec<LoaderReport>,
    ) -> Result<FileWalk, WorkerError> {
        let records = self.artifacts_client().fetch_jsonl(&file.artifact_id, true).await?;
        let sync_unit = self.event().event_context.sync_unit.clone();
        let mut report = LoaderReport::new(&file.item_type);
        let mut line = file.line_to_process;
        let mut interrupted = false;

        while line < file.count.min(records.len()) {
            if self.is_timeout() {
                interrupted = true;
                break;
            }
            let record = &records[line];
            let target = record.get("id").and_then(|v| v.as_str()).unwrap_or_default();

            match self.load_item(&sync_unit, target, record, to_load).await {
                Applied::Created => report.record_created(),
                Applied::Updated => report.record_updated(),
                Applied::Failed(error) => {
                    tracing::warn!(
                        item_type = %file.item_type,
                        line,
                        error = %error,
                        "record failed to load"
                    );
                    report.record_failed();
                }
                Applied::Delayed(delay) => {
                    self.store_file_progress(file_index, line, false, &mut report, reports);
                    return Ok(FileWalk::RateLimited(delay));
                }
            }
            line += 1;
        }

        let completed = !interrupted && line >= file.count.min(records.len());
        self.store_file_progress(file_index, line, completed, &mut report, reports);
        Ok(if completed { FileWalk::Completed } else { FileWalk::Interrupted })
    }

    /// Resolve the mapper for one record and invoke update or create.
    async fn load_item(
        &self,
        sync_unit: &str,
        target: &str,
        record: &Value,
        to_load: &ItemTypeToLoad,
    ) -> Applied {
        let mapper = match self.mappers_client().get_by_target(sync_unit, target).await {
            Ok(mapper) => mapper,
            Err(e) => return Applied::Failed(e.to_string()),
        };

        match mapper {
            Some(mapper) => {
                let result = to_load.loader.update(record, &mapper).await;
                if let Some(delay) = result.delay {
                    return Applied::Delayed(delay);
                }
                if let Some(error) = result.error {
                    return Applied::Failed(error);
                }
                if let Err(e) = self.mappers_client().update(sync_unit, &mapper).await {
                    return Applied::Failed(e.to_string());
                }
                Applied::Updated
            }
            None => {
                let result = to_load.loader.create(record).await;
                if let Some(delay) = result.delay {
                    return Applied::Delayed(delay);
                }
                if let Some(error) = result.error {
                    return Applied::Failed(error);
                }
                let external_id = result.id.unwrap_or_default();
                let mapper = MapperRecord {
                    external_ids: vec![external_id],
                    targets: vec![target.to_string()],
                    status: None,
                    extra_data: None,
                };
                if let Err(e) = self.mappers_client().create(sync_unit, &mapper).await {
                    return Applied::Failed(e.to_string());
                }
                Applied::Created
            }
        }
    }

    fn store_file_progress(
        &self,
        file_index: usize,
        line: usize,
        completed: bool,
        report: &mut LoaderReport,
        reports: &mut Vec<LoaderReport>,
    ) {
        self.modify_state("fromDevRev.filesToLoad", |state| {
            if let Some(file) = state.from_devrev.files_to_load.get_mut(file_index) {
                file.line_to_process = line.max(file.line_to_process);
                if completed {
                    file.completed = true;
                }
            }
        });
        merge_reports(reports, report);
    }
}

/// How far one file's walk got.
enum FileWalk {
    Completed,
    RateLimited(u64),
    Interrupted,
}

/// How one record landed in the external system.
enum Applied {
    Created,
    Updated,
    Failed(String),
    Delayed(u64),
}

fn parse_stats_files(artifact_id: &str, stats: &Value) -> Result<Vec<FileToLoad>, WorkerError> {
    let entries = stats
        .get("files")
        .and_then(|v| v.as_array())
        .or_else(|| stats.as_array())
        .ok_or_else(|| {
            WorkerError::BadStatsArtifact(artifact_id.to_string(), "expected a file array".into())
        })?;

    entries
        .iter()
        .map(|entry| {
            serde_json::from_value::<FileToLoad>(entry.clone()).map_err(|e| {
                WorkerError::BadStatsArtifact(artifact_id.to_string(), e.to_string())
            })
        })
        .collect()
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
