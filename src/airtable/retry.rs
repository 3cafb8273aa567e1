//! Retry budget and the sleep seam used for 429 backoff.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};

use crate::config::AirtableConfig;

/// Waits for a duration. Only the calling task is suspended.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Sleeps for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by the Tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// How the gateway reacts to retryable responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total requests allowed while Airtable answers 429.
    pub max_attempts: u32,
    /// Wait used when a 429 carries no usable `Retry-After`.
    pub fallback_wait: Duration,
    /// Ceiling on any single wait.
    pub max_wait: Duration,
    /// Deadline of one exchange, reported in timeout errors.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&AirtableConfig::default())
    }
}

impl From<&AirtableConfig> for RetryPolicy {
    fn from(config: &AirtableConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            fallback_wait: Duration::from_millis(config.retry_after_fallback_ms),
            max_wait: Duration::from_secs(config.max_retry_after_secs),
            timeout: config.timeout(),
        }
    }
}

impl RetryPolicy {
    /// Wait before retrying a 429, from its `Retry-After` header.
    ///
    /// Only the delay-seconds form is understood; anything else falls back.
    #[must_use]
    pub fn rate_limit_wait(&self, headers: &HeaderMap) -> Duration {
        headers
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map_or(self.fallback_wait, |secs| {
                Duration::from_secs_f64(secs.min(self.max_wait.as_secs_f64()))
            })
            .min(self.max_wait)
    }
}
