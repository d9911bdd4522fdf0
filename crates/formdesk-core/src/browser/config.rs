//! Browser configuration.

use std::time::Duration;

use crate::retry::RetryPolicy;

/// Default bound on a single page fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Tunables for page loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowserConfig {
    /// Bound on a single fetch attempt.
    pub fetch_timeout: Duration,
    /// Retry policy for transient fetch failures.
    pub retry: RetryPolicy,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}
