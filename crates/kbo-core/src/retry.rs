//! Bounded retries with linear backoff, folded into a [`CrawlResult`].
//!
//! ```text
//! attempt 1 --fail--> sleep(base * 1) --> attempt 2 --fail--> sleep(base * 2) --> ... attempt N --fail--> failure envelope
//!     \--ok--> success envelope
//! ```

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::models::CrawlResult;

/// Message used when the final failure renders to an empty string.
pub const UNKNOWN_ERROR: &str = "unknown error";

/// How many times to try and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Values below 1 behave as 1.
    pub max_attempts: u32,
    /// Delay before attempt `n + 1` is `base_delay * n`.
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay after the given failed attempt (1-indexed).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

/// Runs an arbitrary fallible operation under a [`RetryPolicy`].
///
/// Every failure is treated as retryable; the executor never looks at what
/// kind of error it got.
#[derive(Debug, Clone)]
pub struct ResilientExecutor {
    policy: RetryPolicy,
    source: String,
}

impl ResilientExecutor {
    /// `source` is stamped on every envelope (the crawler's base origin).
    pub fn new(policy: RetryPolicy, source: impl Into<String>) -> Self {
        Self {
            policy,
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Executes `operation` until it succeeds or the attempts run out.
    pub async fn execute<T, E, F, Fut>(&self, mut operation: F) -> CrawlResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(data) => {
                    tracing::info!(attempt, max_attempts, source = %self.source, "Crawl succeeded");
                    return CrawlResult::ok(data, self.source.clone());
                }
                Err(e) => {
                    let message = e.to_string();
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        error = %message,
                        "Crawl attempt {}/{} failed",
                        attempt,
                        max_attempts
                    );

                    if attempt >= max_attempts {
                        let message = if message.is_empty() {
                            UNKNOWN_ERROR.to_string()
                        } else {
                            message
                        };
                        return CrawlResult::failure(message, self.source.clone());
                    }

                    tokio::time::sleep(self.policy.delay_after(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }
}
