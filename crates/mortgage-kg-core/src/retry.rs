//! Retry with exponential backoff, used by the graph store adapter (§4.8:
//! "transient errors... retried with exponential backoff, at least 3
//! attempts") and by LLM calls (§6 `LlmClient::complete`).
//!
//! Generalizes the call-site shape observed across the teacher's provider
//! crates (`RetryPolicy::exponential(n)` built once per operation kind, then
//! threaded through `with_retry(&policy, || async { ... })`).

use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;

/// A retry policy: exponential backoff with jitter, capped at a maximum
/// number of attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    /// An exponential backoff policy with `max_attempts` total tries
    /// (including the first) and a 100ms base delay.
    #[must_use]
    pub fn exponential(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
        }
    }

    /// Override the base delay between the first and second attempt.
    #[must_use]
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Override the ceiling any single backoff step can reach.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Total attempts this policy allows, including the first.
    #[must_use]
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    fn strategy(&self) -> impl Iterator<Item = Duration> {
        let max_delay = self.max_delay;
        ExponentialBackoff::from_millis(2)
            .factor(self.base_delay.as_millis().max(1) as u64)
            .map(move |d| d.min(max_delay))
            .map(jitter)
            .take(self.max_attempts.saturating_sub(1))
    }
}

/// Run `op`, retrying per `policy` as long as `should_retry` returns true for
/// the error. The final attempt's error (or the first non-retryable one) is
/// returned on exhaustion.
pub async fn with_retry<T, E, Op, Fut, ShouldRetry>(
    policy: &RetryPolicy,
    should_retry: ShouldRetry,
    mut op: Op,
) -> Result<T, E>
where
    Op: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    ShouldRetry: Fn(&E) -> bool,
{
    RetryIf::spawn(policy.strategy(), || op(), |e: &E| should_retry(e)).await
}
