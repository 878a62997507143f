// Retry loop for read-only lookups

use crate::config::RetryConfig;
use crate::error::ApiError;
use std::future::Future;
use tracing::{debug, warn};

// Runs `call` until it succeeds, fails with a non-retryable error, or the
// retry budget is spent. Only use this for idempotent reads.
pub async fn retry_lookup<T, F, Fut>(
    retry: &RetryConfig,
    operation: &str,
    mut call: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt = 0;
    loop {
        match call().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(operation, attempt, "lookup succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) if error.is_retryable() && attempt < retry.max_retries => {
                let backoff = retry.backoff(attempt);
                warn!(
                    operation,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %error,
                    "lookup failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_retry(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
            backoff_multiplier: 2.0,
            jitter_factor: 0.0,
        }
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let result = retry_lookup(&fast_retry(3), "meals", move || async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(ApiError::Timeout(100))
            } else {
                Ok("ok")
            }
        })
        .await;

        assert_eq!(result, Ok("ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_budget_is_respected() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let result: Result<(), _> = retry_lookup(&fast_retry(2), "baggage", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(ApiError::NetworkError("reset".into()))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_fail_fast() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let result: Result<(), _> = retry_lookup(&fast_retry(5), "fare rules", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(ApiError::Unauthorized)
        })
        .await;

        assert_eq!(result, Err(ApiError::Unauthorized));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
