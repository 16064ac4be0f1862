//! Token-bucket rate limiting for outbound LLM calls (§6 "the LLM client
//! enforces its own rate limit"; §9 "the bucket has a defined init/shutdown
//! lifecycle owned by the orchestrator").
//!
//! Generalizes the teacher's `InMemoryRateLimiter::new(rate_per_sec,
//! check_interval, max_burst)` call-site shape observed in `dashflow-ollama`.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// A rate limiter that can be asked to wait for permission to proceed.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Block until a permit is available, then consume it.
    async fn acquire(&self);

    /// Try to consume a permit without waiting; `true` if one was available.
    fn try_acquire(&self) -> bool;
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// An in-process token bucket. `rate_per_sec` tokens accrue continuously,
/// capped at `max_burst`; `check_interval` is the poll granularity used by
/// `acquire` while waiting.
pub struct InMemoryRateLimiter {
    rate_per_sec: f64,
    max_burst: f64,
    check_interval: Duration,
    bucket: Mutex<Bucket>,
}

impl InMemoryRateLimiter {
    /// Construct a limiter allowing `rate_per_sec` sustained operations per
    /// second with bursts up to `max_burst`, polling every `check_interval`
    /// while a caller waits for a permit.
    #[must_use]
    pub fn new(rate_per_sec: f64, check_interval: Duration, max_burst: f64) -> Self {
        Self {
            rate_per_sec,
            max_burst,
            check_interval,
            bucket: Mutex::new(Bucket {
                tokens: max_burst,
                last_refill: Instant::now(),
            }),
        }
    }

    fn refill(&self, bucket: &mut Bucket) {
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate_per_sec).min(self.max_burst);
        bucket.last_refill = now;
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn acquire(&self) {
        loop {
            if self.try_acquire() {
                return;
            }
            tokio::time::sleep(self.check_interval).await;
        }
    }

    fn try_acquire(&self) -> bool {
        let mut bucket = self.bucket.lock();
        self.refill(&mut bucket);
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_full_burst_capacity() {
        let limiter = InMemoryRateLimiter::new(1.0, Duration::from_millis(10), 3.0);
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[tokio::test]
    async fn acquire_waits_for_refill() {
        let limiter = InMemoryRateLimiter::new(100.0, Duration::from_millis(1), 1.0);
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
        tokio::time::timeout(Duration::from_secs(1), limiter.acquire())
            .await
            .expect("acquire should complete once tokens refill");
    }
}
