// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loader-side value types: files to load and per-item-type reports.

use serde::{Deserialize, Serialize};

/// One transformer artifact the loader works through, with resume position.
///
/// `line_to_process` advances monotonically; `completed` flips exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileToLoad {
    pub artifact_id: String,
    pub item_type: String,
    pub count: usize,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, rename = "lineToProcess")]
    pub line_to_process: usize,
}

/// Per-item-type outcome counts for a load pass.
///
/// Merging sums matching fields, with absent counts acting as identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderReport {
    pub item_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed: Option<u64>,
}

impl LoaderReport {
    pub fn new(item_type: impl Into<String>) -> Self {
        Self { item_type: item_type.into(), ..Self::default() }
    }

    /// Merge another report for the same item type into this one.
    pub fn merge(&mut self, other: &LoaderReport) {
        self.created = sum_opt(self.created, other.created);
        self.updated = sum_opt(self.updated, other.updated);
        self.failed = sum_opt(self.failed, other.failed);
    }

    pub fn record_created(&mut self) {
        self.created = Some(self.created.unwrap_or(0) + 1);
    }

    pub fn record_updated(&mut self) {
        self.updated = Some(self.updated.unwrap_or(0) + 1);
    }

    pub fn record_failed(&mut self) {
        self.failed = Some(self.failed.unwrap_or(0) + 1);
    }
}

fn sum_opt(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (None, None) => None,
        (x, None) | (None, x) => x,
        (Some(x), Some(y)) => Some(x + y),
    }
}

/// Merge a report into a list keyed by item type, appending when the item
/// type has not been seen yet.
pub fn merge_reports(reports: &mut Vec<LoaderReport>, incoming: &LoaderReport) {
    if let Some(existing) = reports.iter_mut().find(|r| r.item_type == incoming.item_type) {
        existing.merge(incoming);
    } else {
        reports.push(incoming.clone());
    }
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
