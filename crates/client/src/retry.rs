// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client-side retry policy for all platform HTTP.

use crate::error::ClientError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Exponential backoff with full jitter, plus `Retry-After` observance.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Backoff before attempt `attempt + 1`: a uniform sample from
    /// `(0, min(max_delay, base * 2^attempt)]`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.saturating_mul(1u32 << attempt.min(16));
        let ceiling = exp.min(self.max_delay);
        let ms = ceiling.as_millis().max(1) as u64;
        Duration::from_millis(rand::rng().random_range(1..=ms))
    }
}

/// Run `operation` under the retry policy.
///
/// Retried errors: transport failures, 5xx, and 429 with a parseable
/// `Retry-After` (in which case that exact delay is observed instead of
/// backoff). On exhaustion the final error is scrubbed of credentials.
pub async fn with_retries<T, F, Fut>(
    name: &str,
    policy: &RetryPolicy,
    operation: F,
) -> Result<T, ClientError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt + 1 < policy.max_attempts => {
                let delay = match e.retry_after() {
                    Some(seconds) => Duration::from_secs(seconds),
                    None => policy.backoff(attempt),
                };
                tracing::warn!(
                    operation = name,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "retrying after failure"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                let scrubbed = e.scrubbed();
                tracing::error!(operation = name, error = %scrubbed, "request failed");
                return Err(scrubbed);
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
