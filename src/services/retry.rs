use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;

use crate::{
    config::Config,
    constants::{STORE_RETRY_JITTER_MS, STORE_RETRY_MAX_DELAY_MS},
    error::Result,
};

/// Bounded retry with exponential backoff for transient store faults.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            attempts: config.store_retry_attempts.max(1),
            base_delay: Duration::from_millis(config.store_retry_base_delay_ms),
        }
    }

    /// Delay before retry number `failures` (1-based), without jitter.
    pub fn backoff(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(10);
        let multiplier = 1_u64 << exponent;
        let base_ms = self.base_delay.as_millis() as u64;
        let candidate = base_ms.saturating_mul(multiplier);
        Duration::from_millis(candidate.min(STORE_RETRY_MAX_DELAY_MS))
    }

    fn jittered_backoff(&self, failures: u32) -> Duration {
        let jitter = if STORE_RETRY_JITTER_MS == 0 || self.base_delay.is_zero() {
            0
        } else {
            rand::rng().random_range(0..=STORE_RETRY_JITTER_MS)
        };
        self.backoff(failures) + Duration::from_millis(jitter)
    }
}

/// Runs `op` until it succeeds, fails with a non-transient error, or the
/// attempt budget is spent. The last error is returned.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut failures = 0_u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && failures + 1 < policy.attempts => {
                failures += 1;
                let delay = policy.jittered_backoff(failures);
                tracing::warn!(
                    "{} transient failure: {} (attempt {}/{}, backoff={}ms)",
                    operation,
                    err,
                    failures,
                    policy.attempts,
                    delay.as_millis()
                );
                sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            base_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            attempts: 3,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
        assert_eq!(
            policy.backoff(30),
            Duration::from_millis(STORE_RETRY_MAX_DELAY_MS)
        );
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures_within_budget() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&policy(3), "find", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(AppError::StoreUnavailable("connection reset".to_string()))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_attempt_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(&policy(3), "find", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::StoreUnavailable("down".to_string()))
        })
        .await;

        assert!(matches!(result, Err(AppError::StoreUnavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_validation_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(&policy(5), "find", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::Validation("bad".to_string()))
        })
        .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
