//! Retry logic for collaborator calls.
//!
//! Implements exponential backoff with jitter. Which failures are worth
//! another attempt is decided by the error type through [`Retryable`].

use rand::Rng;
use std::future::Future;
use std::time::Duration;

use crate::error::Retryable;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Initial delay before first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries, including server-requested waits.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Create a policy with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Build a policy from configured millisecond bounds.
    pub fn from_millis(max_retries: u32, initial_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_millis(initial_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms),
            ..Default::default()
        }
    }

    /// Calculate the delay for a given attempt number.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_delay =
            self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);
        let capped_delay = base_delay.min(self.max_delay.as_millis() as f64);

        let final_delay = if self.jitter {
            let jitter_factor = rand::thread_rng().gen_range(0.5..1.5);
            capped_delay * jitter_factor
        } else {
            capped_delay
        };

        Duration::from_millis(final_delay as u64)
    }

    /// Delay before the next attempt, honoring a server-requested wait.
    fn next_delay<E: Retryable>(&self, error: &E, attempt: u32) -> Duration {
        match error.retry_after() {
            Some(wait) => wait.min(self.max_delay),
            None => self.delay_for_attempt(attempt),
        }
    }
}

/// Execute an operation with retry logic.
///
/// Errors for which [`Retryable::should_retry`] is false are returned
/// immediately; the last error is returned once retries are exhausted.
pub async fn with_retry<F, Fut, T, E>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Debug,
{
    let mut attempts = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !e.should_retry() || attempts >= policy.max_retries {
                    return Err(e);
                }

                let delay = policy.next_delay(&e, attempts);
                attempts += 1;
                tracing::debug!(attempt = attempts, ?delay, error = ?e, "retrying after failure");
                tokio::time::sleep(delay).await;
            }
        }
    }
}
