//! Retry policy for document store calls
//!
//! Only transient failures are retried. Each call site names its operation so
//! an exhausted retry reports what was being attempted.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::config::RetrySettings;
use crate::error::{RecommenderError, Result, StoreError, StoreResult};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetrySettings::default())
    }
}

impl RetryPolicy {
    pub fn from_config(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            max_backoff: Duration::from_millis(settings.max_backoff_ms),
            multiplier: settings.multiplier,
        }
    }

    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt.saturating_sub(1) as i32);
        let millis = self.initial_backoff.as_millis() as f64 * factor;
        Duration::from_millis(millis as u64).min(self.max_backoff)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let delay = self.backoff(attempt);
                    warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Transient store failure, retrying: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e @ StoreError::Transient(_)) => {
                    return Err(RecommenderError::StoreExhausted {
                        operation: operation.to_string(),
                        attempts: attempt,
                        source: e,
                    })
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
            multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = fast_policy(4)
            .run("flaky", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(StoreError::Transient("timeout".into()))
                } else {
                    Ok(7)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_escalates() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<()> = fast_policy(3)
            .run("always_down", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(StoreError::Transient("connection reset".into()))
            })
            .await;
        match result {
            Err(RecommenderError::StoreExhausted { operation, attempts, .. }) => {
                assert_eq!(operation, "always_down");
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<()> = fast_policy(5)
            .run("broken", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(StoreError::Backend("syntax error".into()))
            })
            .await;
        assert!(matches!(result, Err(RecommenderError::Store(StoreError::Backend(_)))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_millis(300),
            multiplier: 2.0,
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(50));
        assert_eq!(policy.backoff(2), Duration::from_millis(100));
        assert_eq!(policy.backoff(6), Duration::from_millis(300));
    }
}
