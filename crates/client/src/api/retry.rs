//! Bounded retry with exponential backoff for API requests.
//!
//! Every attempt races the request future against a per-attempt timeout;
//! a fired timeout cancels the in-flight future and is treated like any
//! other failure. Retry eligibility is decided by the error
//! classification in [`super::error`], so the retry engine and the UI
//! always agree on what counts as transient.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use super::error::ApiError;
use crate::config::{DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT};

/// Default delay before the first retry.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(1000);

/// Default upper bound on a single retry delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(10_000);

/// Default backoff multiplier between consecutive retries.
pub const DEFAULT_BACKOFF_MULTIPLIER: u32 = 2;

/// Observer invoked before each retry sleep, for diagnostics only.
///
/// Receives the attempt number that just failed (0-based), the delay
/// about to be slept, and the error that triggered the retry. Must not
/// alter control flow.
pub type RetryObserver<'a> = &'a (dyn Fn(u32, Duration, &ApiError) + Send + Sync);

/// Bounded retry policy used by the request gateway.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Number of automatic re-attempts after the first failure.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on a single retry delay.
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each attempt.
    pub backoff_multiplier: u32,
    /// Per-attempt timeout; a fired timeout cancels the attempt.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    /// Delay to sleep after the given failed attempt (0-based).
    ///
    /// `delay = min(initial_delay * multiplier^attempt, max_delay)`, so
    /// delays are non-decreasing until capped.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = u128::from(self.backoff_multiplier).saturating_pow(attempt);
        let millis = self
            .initial_delay
            .as_millis()
            .saturating_mul(factor)
            .min(self.max_delay.as_millis());
        Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX))
    }

    /// Run `request` with this policy, re-invoking it on retryable
    /// failures until the budget is exhausted.
    ///
    /// Attempts are strictly sequential; a retry is never issued before
    /// the prior attempt resolved or timed out. The last observed error
    /// is what propagates once retries are exhausted.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable error, or the last error after
    /// `max_retries + 1` failed attempts.
    pub async fn execute<F, Fut, T>(
        &self,
        mut request: F,
        on_retry: Option<RetryObserver<'_>>,
    ) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(self.timeout, request()).await {
                Ok(result) => result,
                // The in-flight future is dropped when the timer fires
                Err(_elapsed) => Err(ApiError::Timeout),
            };

            let error = match result {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !error.is_retryable() || attempt >= self.max_retries {
                if attempt > 0 {
                    warn!(attempt, error = %error, "giving up after retries");
                }
                return Err(error);
            }

            let delay = self.delay_for(attempt);
            debug!(attempt, delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX), error = %error, "retrying request");
            if let Some(observer) = on_retry {
                observer(attempt, delay, &error);
            }
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
