// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the in-worker runtime.

use airlift_client::ClientError;

/// Errors a connector task may surface; serialized by the harness before
/// the worker exits 1.
pub type TaskError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("client error: {0}")]
    Client(#[from] ClientError),

    #[error("upload failed for {item_type}: {source}")]
    Upload {
        item_type: String,
        source: ClientError,
    },

    #[error("stats artifact {0} is not decodable: {1}")]
    BadStatsArtifact(String, String),
}
