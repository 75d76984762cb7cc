//! Bounded exponential-backoff retry.

use goban_core::{error::RemoteError, model::RetryPolicy};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Runs one remote operation up to `max_retries + 1` times.
///
/// After failed attempt `n` (0-indexed) the executor sleeps `base * 2^n`
/// before trying again. Only [`RemoteError::is_retryable`] failures are
/// retried; anything else is returned as-is on the spot.
#[derive(Debug, Clone, Copy)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Sleep after failed attempt `attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.policy
            .base_interval
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Execute `operation`, retrying transient failures.
    ///
    /// The same closure is called on every attempt, so the operation must be
    /// safe to repeat.
    pub async fn execute<T, F, Fut>(&self, mut operation: F) -> Result<T, RemoteError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let attempts = self.policy.max_retries.saturating_add(1);
        let mut attempt = 0;
        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => e,
            };

            if attempt + 1 >= attempts {
                return Err(RemoteError::Exhausted {
                    attempts,
                    last: Box::new(err),
                });
            }

            let wait = self.backoff(attempt);
            warn!(
                "attempt {}/{attempts} failed, retrying in {}s: {err}",
                attempt + 1,
                wait.as_secs_f64()
            );
            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    fn executor(max_retries: u32, base_secs: u64) -> RetryExecutor {
        RetryExecutor::new(RetryPolicy {
            max_retries,
            base_interval: Duration::from_secs(base_secs),
        })
    }

    /// Operation that fails `failures` times with a transport error, then succeeds.
    fn flaky(failures: u32, calls: Arc<AtomicU32>) -> impl FnMut() -> std::future::Ready<Result<u32, RemoteError>> {
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(if n < failures {
                Err(RemoteError::Transport(format!("boom {n}")))
            } else {
                Ok(n)
            })
        }
    }

    #[test]
    fn test_backoff_doubles() {
        let ex = executor(3, 2);
        assert_eq!(ex.backoff(0), Duration::from_secs(2));
        assert_eq!(ex.backoff(1), Duration::from_secs(4));
        assert_eq!(ex.backoff(2), Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_k_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let started = Instant::now();
        let out = executor(3, 2).execute(flaky(2, calls.clone())).await.unwrap();
        assert_eq!(out, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // Slept 2s + 4s.
        assert_eq!(started.elapsed().as_secs(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_exhausts_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let started = Instant::now();
        let err = executor(3, 2)
            .execute(flaky(u32::MAX, calls.clone()))
            .await
            .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // 2 + 4 + 8; no sleep after the last attempt.
        assert_eq!(started.elapsed().as_secs(), 14);
        match err {
            RemoteError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 4);
                assert!(last.to_string().contains("boom 3"));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_runs_once_without_sleeping() {
        let calls = Arc::new(AtomicU32::new(0));
        let started = Instant::now();
        let err = executor(0, 5)
            .execute(flaky(u32::MAX, calls.clone()))
            .await
            .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed().as_secs(), 0);
        assert!(matches!(err, RemoteError::Exhausted { attempts: 1, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_fails_fast() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let err = executor(3, 2)
            .execute(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                std::future::ready(Err::<(), _>(RemoteError::InvalidCredential))
            })
            .await
            .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(err, RemoteError::InvalidCredential));
    }
}
