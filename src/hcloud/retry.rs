//! Bounded retry for requests that hit a locked resource.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::error::{Error, ErrorCode};
use super::Client;

/// How `locked` errors are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryOptions {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Base delay; attempt `n` waits `n * delay`.
    pub delay: Duration,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: 5,
            delay: Duration::from_secs(1),
        }
    }
}

impl Client {
    /// Run `op`, retrying while the API reports the resource as `locked`.
    pub async fn retry_locked<T, F, Fut>(&self, mut op: F) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Err(err) if err.is_code(&ErrorCode::Locked) && attempt < self.retry.max_retries => {
                    attempt += 1;
                    let delay = self.retry.delay * attempt;
                    warn!(attempt, ?delay, error = %err, "Resource locked, retrying");
                    tokio::time::sleep(delay).await;
                },
                result => return result,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hcloud::{ApiError, Method};
    use crate::testing::MockTransport;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_retries_locked_until_success() {
        let client = MockTransport::new().client();
        let calls = AtomicU32::new(0);
        let calls_ref = &calls;

        let result = client
            .retry_locked(|| async move {
                if calls_ref.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ApiError::new(ErrorCode::Locked, "locked").into())
                } else {
                    Ok(7)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let client = MockTransport::new().client().with_retry_options(RetryOptions {
            max_retries: 2,
            delay: Duration::from_millis(10),
        });
        let calls = AtomicU32::new(0);
        let calls_ref = &calls;

        let result: Result<(), Error> = client
            .retry_locked(|| async move {
                calls_ref.fetch_add(1, Ordering::SeqCst);
                Err(ApiError::new(ErrorCode::Locked, "locked").into())
            })
            .await;

        assert!(result.unwrap_err().is_code(&ErrorCode::Locked));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let mock = MockTransport::new();
        let client = mock.client();

        let result: Result<serde_json::Value, Error> = client
            .retry_locked(|| client.get(crate::hcloud::Endpoint::Cloud, "/zones/1"))
            .await;

        assert!(result.unwrap_err().is_not_found());
        assert_eq!(mock.requests().len(), 1);
        assert_eq!(mock.requests()[0].method, Method::Get);
    }
}
