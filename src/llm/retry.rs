//! Timeout, bounded retry and cancellation for backend calls

use super::LlmError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const MAX_BACKOFF_SHIFT: u32 = 16;

/// How a single backend call is bounded and retried
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; values below 1 behave as 1
    pub max_attempts: u32,
    /// Deadline for each individual attempt
    pub timeout: Duration,
    /// Backoff after the first failed attempt, doubled for each later one
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            timeout: Duration::from_secs(60),
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// One attempt, no retries
    pub fn single_attempt(timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            timeout,
            base_delay: Duration::ZERO,
        }
    }

    /// Exponential backoff after the given failed attempt: 1x, 2x, 4x ...
    pub fn delay_for(&self, failed_attempt: u32) -> Duration {
        let shift = failed_attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
        self.base_delay.saturating_mul(1 << shift)
    }
}

/// Run `operation` under `policy`, abandoning it when `cancel` fires.
///
/// Only retryable errors are retried. A backend-supplied `retry_after`
/// takes precedence over the computed backoff. Either delay is capped at
/// the attempt timeout.
pub async fn run_with_policy<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        if cancel.is_cancelled() {
            return Err(LlmError::cancelled());
        }

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(LlmError::cancelled()),
            outcome = tokio::time::timeout(policy.timeout, operation()) => {
                outcome.unwrap_or_else(|_| Err(LlmError::timeout(policy.timeout)))
            }
        };

        match result {
            Ok(value) => return Ok(value),
            Err(e) if e.kind.is_retryable() && attempt < max_attempts => {
                let delay = e
                    .retry_after
                    .unwrap_or_else(|| policy.delay_for(attempt))
                    .min(policy.timeout);
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms = %delay.as_millis(),
                    error = %e,
                    "Retrying backend request"
                );
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(LlmError::cancelled()),
                    () = tokio::time::sleep(delay) => {}
                }
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
