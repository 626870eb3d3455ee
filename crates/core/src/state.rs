// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resumable adapter state, round-tripped verbatim between invocations.
//!
//! The wire layout keeps the original camelCase keys so persisted state
//! written by earlier runtime versions keeps loading unchanged.

use crate::loader::FileToLoad;
use serde::{Deserialize, Serialize};

/// `{id, parent_id}` reference to an already-streamed attachment.
///
/// Legacy state persisted these as bare id strings; those deserialize with
/// an empty `parent_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedRef {
    pub id: String,
    #[serde(default)]
    pub parent_id: String,
}

impl ProcessedRef {
    pub fn new(id: impl Into<String>, parent_id: impl Into<String>) -> Self {
        Self { id: id.into(), parent_id: parent_id.into() }
    }
}

impl<'de> Deserialize<'de> for ProcessedRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Plain(String),
            Full {
                id: String,
                #[serde(default)]
                parent_id: String,
            },
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Plain(id) => ProcessedRef { id, parent_id: String::new() },
            Raw::Full { id, parent_id } => ProcessedRef { id, parent_id },
        })
    }
}

/// Resume bookkeeping for attachment extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentsMetadata {
    #[serde(default, rename = "artifactIds")]
    pub artifact_ids: Vec<String>,
    #[serde(default, rename = "lastProcessed")]
    pub last_processed: usize,
    #[serde(default, rename = "lastProcessedAttachmentsIdsList")]
    pub last_processed_attachments_ids_list: Vec<ProcessedRef>,
}

/// Extractor-direction section of the adapter state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToDevRev {
    #[serde(default, rename = "attachmentsMetadata")]
    pub attachments_metadata: AttachmentsMetadata,
}

/// Loader-direction section of the adapter state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FromDevRev {
    #[serde(default, rename = "filesToLoad")]
    pub files_to_load: Vec<FileToLoad>,
}

/// Full adapter state: an opaque connector section plus the runtime's own
/// bookkeeping. Missing substructures initialize to empty on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdapterState<S> {
    #[serde(default)]
    pub connector: S,
    #[serde(default, rename = "toDevRev")]
    pub to_devrev: ToDevRev,
    #[serde(default, rename = "fromDevRev")]
    pub from_devrev: FromDevRev,
    #[serde(default, rename = "lastSyncStarted", skip_serializing_if = "Option::is_none")]
    pub last_sync_started: Option<String>,
    #[serde(
        default,
        rename = "lastSuccessfulSyncStarted",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_successful_sync_started: Option<String>,
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
