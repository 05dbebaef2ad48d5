//! Retry with exponential backoff for remote calls

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::error::{Error, Result};

/// Backoff before retry number `attempt` (0-based): 1s, 2s, 4s ... capped at 32s
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(2u64.pow(attempt.min(5)))
}

/// Run `operation` up to `max_retries + 1` times, sleeping between attempts
///
/// Only transient errors (see [`Error::is_transient`]) are retried; any other
/// error is returned after the attempt that produced it.
pub async fn retry_request<F, Fut, T>(label: &str, max_retries: u32, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_with_delay(label, max_retries, backoff_delay, operation).await
}

/// Same as [`retry_request`] with a caller-supplied delay schedule
pub async fn retry_with_delay<F, Fut, T, D>(
    label: &str,
    max_retries: u32,
    delay: D,
    operation: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
    D: Fn(u32) -> Duration,
{
    let mut last_error = None;

    for attempt in 0..=max_retries {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) => {
                if attempt < max_retries {
                    let wait = delay(attempt);
                    tracing::warn!(
                        "{} failed (attempt {}/{}): {}; retrying in {:?}",
                        label,
                        attempt + 1,
                        max_retries + 1,
                        e,
                        wait
                    );
                    last_error = Some(e);
                    sleep(wait).await;
                } else {
                    last_error = Some(e);
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| Error::internal(format!("{} failed", label))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = retry_with_delay("flaky", 3, |_| Duration::ZERO, || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(Error::status("Upsert", 503, "unavailable"))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_returns_last_error_when_exhausted() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_with_delay("down", 1, |_| Duration::ZERO, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::status("Generation", 502, "bad gateway"))
        })
        .await;

        assert!(matches!(result, Err(Error::Status { status: 502, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_with_delay("rejected", 3, |_| Duration::ZERO, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::status("Embeddings request", 400, "input too long"))
        })
        .await;

        assert!(matches!(result, Err(Error::Status { status: 400, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_is_capped() {
        assert_eq!(backoff_delay(0), Duration::from_secs(1));
        assert_eq!(backoff_delay(3), Duration::from_secs(8));
        assert_eq!(backoff_delay(10), Duration::from_secs(32));
    }
}
