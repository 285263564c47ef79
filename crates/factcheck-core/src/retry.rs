//! Bounded retry with capped exponential backoff for reasoning calls.

use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::ReasoningError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts after the first one.
    pub max_retries: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Per-attempt deadline; an elapsed deadline counts as `ReasoningError::Timeout`.
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: usize, retry: &RetryConfig, attempt_timeout: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff: Duration::from_millis(retry.initial_backoff_ms),
            max_backoff: Duration::from_millis(retry.max_backoff_ms),
            attempt_timeout,
        }
    }

    /// Fail after a single attempt.
    pub fn no_retry(attempt_timeout: Duration) -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            attempt_timeout,
        }
    }

    pub fn backoff_for(&self, attempt: usize) -> Duration {
        let factor = 1u32.checked_shl(attempt.min(16) as u32).unwrap_or(u32::MAX);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Run `operation` until it succeeds, fails terminally, or retries run out.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, ReasoningError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ReasoningError>>,
    {
        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(self.attempt_timeout, operation()).await {
                Ok(result) => result,
                Err(_) => Err(ReasoningError::Timeout),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_retries && err.is_retryable() => {
                    let backoff = self.backoff_for(attempt);
                    attempt += 1;
                    tracing::warn!(
                        call = label,
                        error = %err,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "reasoning call failed, retrying"
                    );
                    if !backoff.is_zero() {
                        tokio::time::sleep(backoff).await;
                    }
                }
                Err(err) => {
                    tracing::warn!(call = label, error = %err, attempts = attempt + 1, "reasoning call gave up");
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn policy(max_retries: usize) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            attempt_timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn retries_until_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let result = policy(2)
            .run("test", || {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(ReasoningError::Malformed("bad".into()))
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_after_bounded_attempts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let result: Result<(), _> = policy(1)
            .run("test", || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ReasoningError::Ambiguous("neither".into()))
                }
            })
            .await;
        assert!(matches!(result, Err(ReasoningError::Ambiguous(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn terminal_errors_are_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let result: Result<(), _> = policy(3)
            .run("test", || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ReasoningError::request("401", false))
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_attempts_time_out() {
        let mut policy = policy(0);
        policy.attempt_timeout = Duration::from_millis(10);
        let result: Result<(), _> = policy
            .run("test", || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert_eq!(result, Err(ReasoningError::Timeout));
    }

    #[test]
    fn backoff_is_capped() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(250),
            attempt_timeout: Duration::from_secs(1),
        };
        assert_eq!(policy.backoff_for(0), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(1), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(4), Duration::from_millis(250));
    }
}
