// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Size-pruning of outbound event payloads.
//!
//! The platform rejects oversized callback bodies, so payloads that would
//! exceed the ceiling are reduced: long strings truncated, large arrays
//! summarized, objects recursed.

use serde_json::{json, Map, Value};

/// Strings longer than this are truncated during pruning.
const MAX_STRING_LEN: usize = 1024;

/// Arrays longer than this are replaced by a summary during pruning.
const MAX_ARRAY_LEN: usize = 10;

fn serialized_len(value: &Value) -> usize {
    serde_json::to_vec(value).map(|v| v.len()).unwrap_or(usize::MAX)
}

/// Prune `value` so its serialized form fits `max_bytes`. Values already
/// within the ceiling pass through untouched.
pub fn prune_to_fit(value: Value, max_bytes: usize) -> Value {
    if serialized_len(&value) <= max_bytes {
        return value;
    }
    let pruned = prune_value(value);
    tracing::warn!(max_bytes, "event payload exceeded size ceiling, pruned");
    pruned
}

fn prune_value(value: Value) -> Value {
    match value {
        Value::String(s) if s.chars().count() > MAX_STRING_LEN => {
            let truncated: String = s.chars().take(MAX_STRING_LEN).collect();
            Value::String(format!("{truncated}...[truncated]"))
        }
        Value::Array(items) if items.len() > MAX_ARRAY_LEN => {
            let length = items.len();
            let mut items = items;
            let last = items.pop().map(prune_value).unwrap_or(Value::Null);
            let first = items.into_iter().next().map(prune_value).unwrap_or(Value::Null);
            json!({
                "type": "array",
                "length": length,
                "firstItem": first,
                "lastItem": last,
            })
        }
        Value::Array(items) => Value::Array(items.into_iter().map(prune_value).collect()),
        Value::Object(fields) => {
            let mut out = Map::with_capacity(fields.len());
            for (key, field) in fields {
                out.insert(key, prune_value(field));
            }
            Value::Object(out)
        }
        other => other,
    }
}

#[cfg(test)]
#[path = "prune_tests.rs"]
mod tests;
