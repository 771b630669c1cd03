//! Bounded retry with exponential backoff for backend calls.

use crate::ports::completion::BackendError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Delay before retry `attempt` (0-indexed): 500 ms doubling, capped at 30 s.
pub(crate) fn backoff_delay(attempt: u32) -> Duration {
    let millis = 500u64.checked_shl(attempt).unwrap_or(u64::MAX).min(30_000);
    Duration::from_millis(millis)
}

/// Run `op`, retrying retryable [`BackendError`]s up to `retry_limit` times.
///
/// Non-retryable errors propagate immediately; a retryable error on the last
/// permitted attempt propagates as-is for the caller to classify.
pub async fn with_retries<T, F, Fut>(retry_limit: u32, mut op: F) -> Result<T, BackendError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BackendError>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < retry_limit => {
                let delay = backoff_delay(attempt);
                warn!(
                    attempt = attempt + 1,
                    retry_limit,
                    delay_ms = delay.as_millis() as u64,
                    "Retryable backend failure: {}",
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_retries_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = with_retries(3, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(BackendError::Timeout)
                } else {
                    Ok("ok")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retries(2, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(BackendError::RateLimited) }
        })
        .await;

        assert!(matches!(result, Err(BackendError::RateLimited)));
        // 1 initial + 2 retries
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retries(5, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(BackendError::Api("bad request".into())) }
        })
        .await;

        assert!(matches!(result, Err(BackendError::Api(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_caps() {
        assert_eq!(backoff_delay(0), Duration::from_millis(500));
        assert_eq!(backoff_delay(1), Duration::from_millis(1000));
        assert_eq!(backoff_delay(10), Duration::from_millis(30_000));
        assert_eq!(backoff_delay(63), Duration::from_millis(30_000));
    }
}
