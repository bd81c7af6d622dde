//! Bounded exponential-backoff retry

use std::future::Future;
use std::time::Duration;

use contentflow_utils::error::WorkflowError;
use contentflow_utils::redaction::redact_error_message;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Delay before the first retry (1 second)
const BASE_DELAY: Duration = Duration::from_secs(1);

/// Largest exponent used for the backoff delay (~17 minutes)
const MAX_BACKOFF_EXPONENT: u32 = 10;

/// Retry policy for stage calls.
///
/// Attempt 0 is the initial call. When attempt `n` fails with a retryable
/// error the controller sleeps [`delay_for(n)`](Self::delay_for) and tries
/// again, so at most `max_retries + 1` calls are made in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
}

/// Successful result together with the number of calls it took.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOutcome<T> {
    pub value: T,
    pub attempts: u32,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// Backoff after attempt `attempt` fails: `2^attempt × 1000 ms`.
    ///
    /// ```rust
    /// use contentflow_http::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::new(3);
    /// assert_eq!(policy.delay_for(0), Duration::from_secs(1));
    /// assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    /// ```
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        BASE_DELAY * 2u32.pow(attempt.min(MAX_BACKOFF_EXPONENT))
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// retry budget is spent.
    ///
    /// `op` receives the zero-based attempt number. Cancelling `cancel` during
    /// a backoff sleep ends the loop with `Aborted`.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable error, or the last error once retries
    /// are exhausted, unchanged.
    pub async fn run<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<RetryOutcome<T>, WorkflowError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, WorkflowError>>,
    {
        let mut attempt: u32 = 0;

        loop {
            let error = match op(attempt).await {
                Ok(value) => {
                    return Ok(RetryOutcome {
                        value,
                        attempts: attempt + 1,
                    });
                }
                Err(error) => error,
            };

            if !error.is_retryable() || attempt >= self.max_retries {
                return Err(error);
            }

            let delay = self.delay_for(attempt);
            warn!(
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                error = %redact_error_message(&error.to_string()),
                "Stage call failed, will retry"
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    return Err(WorkflowError::Aborted {
                        reason: "cancelled during retry backoff".to_string(),
                    });
                }
                () = tokio::time::sleep(delay) => {}
            }

            attempt += 1;
        }
    }
}
