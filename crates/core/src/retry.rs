//! Bounded retry with exponential backoff for suspending backend calls.
//!
//! Only transient-classified errors are retried; permanent errors surface
//! immediately. Every attempt runs under the configured timeout.

use std::future::Future;
use std::time::Duration;

use crate::config::Config;
use crate::error::{Result, ScribeError};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first (1 = no retry).
    pub attempts: u32,
    pub base_delay: Duration,
    pub timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            attempts: config.retry_attempts.max(1),
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            timeout: config.request_timeout(),
        }
    }
}

/// Run `operation` under `policy`, retrying transient failures and timeouts
/// with doubling backoff until the attempt budget is spent.
pub async fn call_with_retry<T, F, Fut>(
    op: &'static str,
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut delay = policy.base_delay;
    let mut attempt = 0;

    loop {
        attempt += 1;
        let error = match tokio::time::timeout(policy.timeout, operation()).await {
            Ok(Ok(value)) => {
                if attempt > 1 {
                    tracing::debug!(op, attempt, "backend call succeeded after retry");
                }
                return Ok(value);
            }
            Ok(Err(e)) => e,
            Err(_) => ScribeError::Timeout {
                op,
                after: policy.timeout,
            },
        };

        if !error.is_transient() || attempt >= policy.attempts {
            return Err(error);
        }

        tracing::warn!(
            op,
            attempt,
            backoff_ms = delay.as_millis() as u64,
            error = %error,
            "transient backend failure, will retry"
        );
        tokio::time::sleep(delay).await;
        delay = delay.saturating_mul(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            base_delay: Duration::from_millis(1),
            timeout: Duration::from_millis(200),
        }
    }

    fn transient() -> ScribeError {
        ScribeError::Optimization {
            transient: true,
            reason: "rate limited".into(),
        }
    }

    fn permanent() -> ScribeError {
        ScribeError::Optimization {
            transient: false,
            reason: "bad request".into(),
        }
    }

    #[tokio::test]
    async fn succeeds_on_first_attempt() {
        let result = call_with_retry("op", policy(3), || async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn retries_transient_errors() {
        let calls = AtomicU32::new(0);
        let result = call_with_retry("op", policy(3), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 { Err(transient()) } else { Ok(42) }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_fail_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = call_with_retry("op", policy(3), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(permanent()) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn attempt_budget_is_bounded() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = call_with_retry("op", policy(3), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(transient()) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn timeouts_count_as_transient() {
        let calls = AtomicU32::new(0);
        let tight = RetryPolicy {
            attempts: 2,
            base_delay: Duration::from_millis(1),
            timeout: Duration::from_millis(10),
        };
        let result: Result<()> = call_with_retry("op", tight, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            }
        })
        .await;
        assert!(matches!(result, Err(ScribeError::Timeout { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
