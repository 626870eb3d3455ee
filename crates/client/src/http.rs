// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared reqwest client construction and response handling.

use crate::error::ClientError;
use std::time::Duration;

/// Per-request ceiling; retries never extend an individual call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub request_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { request_timeout: REQUEST_TIMEOUT }
    }
}

/// Build the shared HTTP client. Construction failure is a programming
/// error surfaced as a transport error so callers keep a uniform
/// error type.
pub fn build_client(config: &HttpConfig) -> Result<reqwest::Client, ClientError> {
    reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .map_err(ClientError::from)
}

/// Parse a `Retry-After` header as non-negative seconds.
fn parse_retry_after(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
}

/// Convert a non-success response into [`ClientError::Status`], reading
/// the body as error detail.
pub async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = parse_retry_after(&response);
    let detail = response.text().await.unwrap_or_default();
    Err(ClientError::Status { status: status.as_u16(), detail, retry_after })
}
