use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Bounded retry with linear backoff: the n-th retry waits `n * backoff_unit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_unit: Duration,
}

impl RetryPolicy {
    pub fn linear(max_retries: u32, backoff_unit: Duration) -> Self {
        Self {
            max_retries,
            backoff_unit,
        }
    }

    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        self.backoff_unit * retry
    }
}

/// Runs `operation` until it succeeds or the policy is exhausted, returning the
/// last error. The closure receives the 1-based attempt number.
///
/// Only use this for operations that are safe to repeat as a whole, such as a
/// transaction that rolled back.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, E>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt > policy.max_retries => {
                warn!(
                    operation = label,
                    attempts = attempt,
                    error = %err,
                    "giving up after all retries"
                );
                return Err(err);
            }
            Err(err) => {
                let delay = policy.delay_before_retry(attempt);
                debug!(
                    operation = label,
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
