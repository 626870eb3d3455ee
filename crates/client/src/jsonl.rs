// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSONL + gzip codec for artifact payloads.

use crate::error::ClientError;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use serde_json::Value;
use std::io::{Read, Write};

/// Serialize objects as newline-delimited JSON and gzip the result.
pub fn to_jsonl_gz<T: Serialize>(objects: &[T]) -> Result<Vec<u8>, ClientError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    for object in objects {
        let line = serde_json::to_vec(object).map_err(|e| ClientError::Decode(e.to_string()))?;
        encoder.write_all(&line)?;
        encoder.write_all(b"\n")?;
    }
    Ok(encoder.finish()?)
}

/// Decode a gzipped JSONL payload into its lines.
pub fn from_jsonl_gz(bytes: &[u8]) -> Result<Vec<Value>, ClientError> {
    let mut decoder = GzDecoder::new(bytes);
    let mut text = String::new();
    decoder.read_to_string(&mut text)?;
    from_jsonl(&text)
}

/// Decode a plain JSONL payload into its lines.
pub fn from_jsonl(text: &str) -> Result<Vec<Value>, ClientError> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(|e| ClientError::Decode(e.to_string())))
        .collect()
}

#[cfg(test)]
#[path = "jsonl_tests.rs"]
mod tests;
