//! Bounded retry with exponential backoff for store reads.
//!
//! Only reads go through [`RetryPolicy::run`]. Mutations are single attempts,
//! so a retried write can never be applied twice.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::Result;

/// Retry settings for transient store failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero behaves like one.
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,
    /// Upper bound for any single delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 2_000,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// Backoff ceiling before retry number `retry` (1-based): doubles each
    /// time, capped at `max_delay_ms`.
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1_u64.checked_shl(retry.saturating_sub(1)).unwrap_or(u64::MAX);
        let millis = self
            .base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);
        Duration::from_millis(millis)
    }

    /// Run `operation`, retrying transient failures.
    ///
    /// Each delay is drawn uniformly from the upper half of the backoff
    /// ceiling so that clients don't retry in lockstep.
    ///
    /// # Errors
    ///
    /// Returns the last error once attempts are exhausted, or the first
    /// non-transient error.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < attempts => {
                    let ceiling = self.backoff(attempt);
                    let delay = jitter(ceiling);
                    warn!("Attempt {attempt}/{attempts} failed: {err}; retrying in {delay:?}");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn jitter(ceiling: Duration) -> Duration {
    if ceiling.is_zero() {
        return ceiling;
    }
    let half = ceiling / 2;
    rand::thread_rng().gen_range(half..=ceiling)
}
