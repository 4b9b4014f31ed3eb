//! Retry logic for idempotent calls.
//!
//! # Responsibilities
//! - Decide whether a failure is transient
//! - Execute retries with exponential backoff + jitter
//!
//! # Design Decisions
//! - Only reads and status pushes are wrapped; the request service treats a
//!   repeated status push as a no-op
//! - Transaction submissions are never retried in-call, a failed one waits
//!   for the next cycle
//! - Permanent failures (malformed responses, rejections) return immediately

use std::future::Future;

use crate::config::RetryConfig;
use crate::resilience::backoff::calculate_backoff;

/// Errors that know whether repeating the call can help.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// Run `op` until it succeeds, fails permanently, or attempts run out.
pub async fn retry_idempotent<T, E, F, Fut>(policy: &RetryConfig, op_name: &str, mut op: F) -> Result<T, E>
where
    E: Transient + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let delay = calculate_backoff(attempt, policy.base_delay_ms, policy.max_delay_ms);
                tracing::debug!(
                    operation = op_name,
                    attempt = attempt,
                    delay = ?delay,
                    error = %e,
                    "Transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct TestError(bool);

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "transient={}", self.0)
        }
    }

    impl Transient for TestError {
        fn is_transient(&self) -> bool {
            self.0
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            base_delay_ms: 1,
            max_delay_ms: 5,
        }
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, TestError> = retry_idempotent(&fast_policy(3), "test", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(TestError(true))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), TestError> = retry_idempotent(&fast_policy(2), "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TestError(true))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), TestError> = retry_idempotent(&fast_policy(5), "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TestError(false))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
