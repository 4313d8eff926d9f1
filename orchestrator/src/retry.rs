use std::{fmt::Debug, future::Future, time::Duration};

use tokio::time::sleep;
use tracing::warn;

use crate::error::IsRetryable;

/// Bounded exponential backoff for transient network faults.
///
/// The first attempt runs immediately; retry `n` waits `base * 2^(n-1)`.
/// Errors that are not retryable are returned as soon as they occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: usize,
    base_backoff: Duration,
}

impl RetryPolicy {
    /// `max_attempts` counts the first try; values below one are raised to one.
    pub fn new(max_attempts: usize, base_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_backoff,
        }
    }

    /// Attempts allowed, including the first
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Delay before retry number `retry` (1-based)
    pub fn backoff(&self, retry: usize) -> Duration {
        let exponent = u32::try_from(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        let factor = 2u32.checked_pow(exponent).unwrap_or(u32::MAX);
        self.base_backoff.saturating_mul(factor)
    }

    /// Run `f` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent. Returns the last error in the latter cases.
    pub async fn run<F, Fut, T, E>(&self, action: &str, mut f: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: IsRetryable + Debug,
    {
        let mut attempt = 1;
        loop {
            match f().await {
                Ok(result) => return Ok(result),
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    let backoff = self.backoff(attempt);
                    warn!(
                        ?err,
                        action,
                        attempt,
                        retries_remaining = self.max_attempts - attempt,
                        ?backoff,
                        "Transient failure. Retrying..."
                    );
                    sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(250))
    }
}
