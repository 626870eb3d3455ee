// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Artifacts, normalized attachments, and related value types.

use serde::{Deserialize, Serialize};

/// A server-side addressable blob produced by uploading one batch of items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    pub item_type: String,
    pub item_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub byte_length: Option<u64>,
}

/// A binary side-channel object associated with a parent record.
///
/// `file_name` is a display and extension hint only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedAttachment {
    pub id: String,
    pub url: String,
    pub parent_id: String,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline: Option<bool>,
}

impl NormalizedAttachment {
    /// Extension hint derived from the file name, for log messages.
    pub fn extension(&self) -> Option<&str> {
        self.file_name.rsplit_once('.').map(|(_, ext)| ext)
    }
}

/// Internal/external id pair on an [`SsorAttachment`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsorAttachmentId {
    pub devrev: String,
    pub external: String,
}

/// External parent reference on an [`SsorAttachment`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsorParentId {
    pub external: String,
}

/// Back-reference record written after an attachment is streamed, linking
/// the uploaded artifact to its external source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SsorAttachment {
    pub id: SsorAttachmentId,
    pub parent_id: SsorParentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline: Option<bool>,
}

/// External data boundary the connector syncs (e.g. one workspace).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalSyncUnit {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
}
