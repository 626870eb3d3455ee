// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for platform HTTP calls.

/// Errors surfaced by the HTTP clients after the retry policy has run.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Network, connect, or timeout failure.
    #[error("request failed: {0}")]
    Transport(String),

    /// Non-success HTTP status. `retry_after` carries a parsed
    /// `Retry-After` header in seconds when the server sent one.
    #[error("status {status}: {detail}")]
    Status {
        status: u16,
        detail: String,
        retry_after: Option<u64>,
    },

    /// Response body did not decode as expected.
    #[error("decode error: {0}")]
    Decode(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Whether the retry policy may re-attempt this error.
    ///
    /// Retried: 5xx, transport errors, and 429 iff `Retry-After` parsed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport(_) => true,
            ClientError::Status { status, retry_after, .. } => {
                (500..=599).contains(status) || (*status == 429 && retry_after.is_some())
            }
            _ => false,
        }
    }

    /// Server-mandated delay to observe before the next attempt.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            ClientError::Status { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Scrub credential material from the error detail before it is
    /// logged or propagated further.
    pub fn scrubbed(self) -> Self {
        match self {
            ClientError::Status { status, detail, retry_after } => ClientError::Status {
                status,
                detail: scrub_credentials(&detail),
                retry_after,
            },
            ClientError::Transport(detail) => {
                ClientError::Transport(scrub_credentials(&detail))
            }
            other => other,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::Decode(e.without_url().to_string())
        } else {
            ClientError::Transport(e.without_url().to_string())
        }
    }
}

/// Replace `Authorization`/`authorization` header values with a marker
/// wherever they appear in an error detail.
pub fn scrub_credentials(detail: &str) -> String {
    let mut out = String::with_capacity(detail.len());
    for (i, line) in detail.lines().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let lower = line.to_ascii_lowercase();
        if let Some(pos) = lower.find("authorization") {
            // Mask everything after the header name's separator.
            let after = pos + "authorization".len();
            match line[after..].find([':', '=']) {
                Some(sep) => {
                    out.push_str(&line[..after + sep + 1]);
                    out.push_str(" <scrubbed>");
                }
                None => out.push_str("<scrubbed>"),
            }
        } else {
            out.push_str(line);
        }
    }
    out
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
