//! Bounded retries with exponential backoff for workflow stages.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Upper bound on the backoff exponent.
const MAX_BACKOFF_SHIFT: u32 = 10;

/// Errors that know whether another attempt may succeed.
pub trait Retryable {
    /// Whether the operation is worth attempting again.
    fn is_retryable(&self) -> bool;
}

/// Retry budget and backoff for a single stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each following one.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Build a policy from a retry budget and base delay.
    #[must_use]
    pub const fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay to wait after the given zero-based failed attempt.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1_u32 << attempt.min(MAX_BACKOFF_SHIFT))
    }
}

/// Final result of a retried operation and the attempts it took.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    /// Result of the last attempt.
    pub result: Result<T, E>,
    /// Attempts made, including the first.
    pub attempts: u32,
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or the
/// policy's budget is spent. `on_retry` observes each failure that will be
/// retried, with the one-based number of the attempt that failed.
pub async fn retry_with_policy<T, E, F, Fut, R>(
    policy: RetryPolicy,
    operation_name: &str,
    mut on_retry: R,
    mut operation: F,
) -> RetryOutcome<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
    R: FnMut(u32, &E),
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => {
                return RetryOutcome {
                    result: Ok(value),
                    attempts: attempt + 1,
                };
            }
            Err(err) => {
                if !err.is_retryable() || attempt >= policy.max_retries {
                    return RetryOutcome {
                        result: Err(err),
                        attempts: attempt + 1,
                    };
                }
                warn!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    error = %err,
                    "retryable failure"
                );
                on_retry(attempt + 1, &err);
                tokio::time::sleep(policy.delay_for(attempt)).await;
                attempt += 1;
            }
        }
    }
}
