//! Single-retry policy for external service calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::Result;

/// Retries a failed service call exactly once after a fixed delay.
///
/// Only errors for which [`RagError::is_retryable`](crate::RagError::is_retryable)
/// holds are retried; everything else is returned immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { backoff: Duration::from_secs(1) }
    }
}

impl RetryPolicy {
    /// Create a policy with the given delay before the retry.
    pub fn new(backoff: Duration) -> Self {
        Self { backoff }
    }

    /// The delay before the retry.
    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Run `op`, and once more after the backoff if the first attempt failed
    /// with a retryable error. The second error is returned as is.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match op().await {
            Err(e) if e.is_retryable() => {
                let backoff_ms = self.backoff.as_millis() as u64;
                warn!(operation, error = %e, backoff_ms, "service call failed, retrying once");
                tokio::time::sleep(self.backoff).await;
                op().await
            }
            other => other,
        }
    }
}
