//! Bounded retry with exponential backoff for embedding calls.

use securerag_core::{AppError, AppResult};
use std::future::Future;
use std::time::Duration;

/// Initial backoff duration in milliseconds
pub const INITIAL_BACKOFF_MS: u64 = 100;

/// Outcome of a single failed attempt.
#[derive(Debug)]
pub enum RetryError {
    /// Worth another attempt (network failure, 429, 5xx)
    Transient(AppError),

    /// Retrying cannot help (rejected credential, malformed request)
    Permanent(AppError),
}

impl RetryError {
    fn into_inner(self) -> AppError {
        match self {
            Self::Transient(e) | Self::Permanent(e) => e,
        }
    }
}

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        }
    }

    /// Delay before the attempt following failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff * 2_u32.saturating_pow(attempt)
    }
}

/// Run `op` until it succeeds, fails permanently, or attempts run out.
pub async fn with_retries<T, F, Fut>(policy: RetryPolicy, label: &str, mut op: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RetryError>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        match op().await {
            Ok(value) => return Ok(value),
            Err(RetryError::Transient(e)) if attempt < policy.max_attempts => {
                let backoff = policy.backoff(attempt);
                tracing::warn!(
                    "{} failed (attempt {}/{}), retrying in {}ms: {}",
                    label,
                    attempt,
                    policy.max_attempts,
                    backoff.as_millis(),
                    e
                );
                tokio::time::sleep(backoff).await;
            }
            Err(e) => return Err(e.into_inner()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::new(3);
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
        assert_eq!(RetryPolicy::new(0).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);

        let result = with_retries(fast(3), "embed", || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(RetryError::Transient(AppError::Embedding("503".to_string())))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);

        let result: AppResult<()> = with_retries(fast(3), "embed", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(RetryError::Transient(AppError::Embedding("timeout".to_string())))
        })
        .await;

        assert!(matches!(result, Err(AppError::Embedding(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let calls = AtomicU32::new(0);

        let result: AppResult<()> = with_retries(fast(5), "embed", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(RetryError::Permanent(AppError::Embedding(
                "API key not valid".to_string(),
            )))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
