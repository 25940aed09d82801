//! Timeouts and exponential backoff for ledger calls.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use dispas_core::constants::{
    DEFAULT_INITIAL_BACKOFF_MS, DEFAULT_LEDGER_TIMEOUT_MS, DEFAULT_MAX_BACKOFF_MS,
    DEFAULT_RETRY_ATTEMPTS,
};
use dispas_core::error::{DispasError, Result};

/// Retry configuration with exponential backoff.
///
/// Every attempt is bounded by `timeout`. Only errors for which
/// [`DispasError::is_retryable`] holds are retried; validation and balance
/// failures surface immediately.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (at least one)
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Upper bound for any single delay
    pub max_backoff: Duration,
    /// Growth factor between consecutive delays
    pub multiplier: f64,
    /// Deadline for each attempt
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_ATTEMPTS,
            initial_backoff: Duration::from_millis(DEFAULT_INITIAL_BACKOFF_MS),
            max_backoff: Duration::from_millis(DEFAULT_MAX_BACKOFF_MS),
            multiplier: 2.0,
            timeout: Duration::from_millis(DEFAULT_LEDGER_TIMEOUT_MS),
        }
    }
}

impl RetryPolicy {
    /// Creates the default policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that tries exactly once.
    pub fn no_retry() -> Self {
        Self::default().max_attempts(1)
    }

    /// Sets the maximum number of attempts.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Sets the initial and maximum backoff.
    pub fn backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max.max(initial);
        self
    }

    /// Sets the per-attempt deadline.
    pub fn timeout(mut self, deadline: Duration) -> Self {
        self.timeout = deadline;
        self
    }

    /// Delay after the failed attempt `attempt` (0-indexed).
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let delay_ms =
            (self.initial_backoff.as_millis() as f64) * self.multiplier.powi(attempt as i32);
        let delay = Duration::from_millis(delay_ms as u64);
        delay.min(self.max_backoff)
    }

    /// Runs `operation` until it succeeds, fails permanently, or the
    /// attempts are used up. Returns the last error in the latter cases.
    pub async fn run<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            let outcome = match timeout(self.timeout, operation()).await {
                Ok(result) => result,
                Err(_) => Err(DispasError::Timeout {
                    millis: self.timeout.as_millis() as u64,
                }),
            };

            match outcome {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(operation_name, attempt = attempt + 1, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempt + 1 < max_attempts => {
                    let delay = self.calculate_delay(attempt);
                    warn!(
                        operation_name,
                        attempt = attempt + 1,
                        max_attempts,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "Transient ledger failure, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast() -> RetryPolicy {
        RetryPolicy::new()
            .max_attempts(3)
            .backoff(Duration::from_millis(1), Duration::from_millis(5))
            .timeout(Duration::from_millis(50))
    }

    #[test]
    fn test_calculate_delay_exponential() {
        let policy = RetryPolicy::new().backoff(Duration::from_millis(100), Duration::from_secs(10));

        assert_eq!(policy.calculate_delay(0), Duration::from_millis(100));
        assert_eq!(policy.calculate_delay(1), Duration::from_millis(200));
        assert_eq!(policy.calculate_delay(2), Duration::from_millis(400));
        assert_eq!(policy.calculate_delay(3), Duration::from_millis(800));
    }

    #[test]
    fn test_calculate_delay_capped_at_max() {
        let policy = RetryPolicy::new().backoff(Duration::from_secs(1), Duration::from_secs(5));

        assert_eq!(policy.calculate_delay(2), Duration::from_secs(4));
        assert_eq!(policy.calculate_delay(3), Duration::from_secs(5));
        assert_eq!(policy.calculate_delay(9), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = fast()
            .run("flaky", || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(DispasError::LedgerUnavailable("connection reset".into()))
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<()> = fast()
            .run("down", || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(DispasError::LedgerUnavailable("down".into())) }
            })
            .await;

        assert!(matches!(result, Err(DispasError::LedgerUnavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<()> = fast()
            .run("broke", || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(DispasError::BareDepositRejected) }
            })
            .await;

        assert!(matches!(result, Err(DispasError::BareDepositRejected)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_slow_attempt_times_out() {
        let policy = RetryPolicy::no_retry().timeout(Duration::from_millis(10));

        let result: Result<()> = policy
            .run("slow", || async {
                sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(DispasError::Timeout { millis: 10 })));
    }
}
