use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};

use recon_model::{BucketStrategy, ModelResult};
use tokio::time::Instant;

use super::RateLimiter;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last: Option<Instant>,
}

/// Token bucket shared by all keys.
///
/// Each call to [`RateLimiter::when`] reserves one token; when the bucket is empty the
/// returned delay is the time until the reserved token is refilled. No per-key state is
/// kept, so `forget` is a no-op and `num_requeues` is always zero.
#[derive(Debug)]
pub struct BucketRateLimiter {
    qps: f64,
    burst: f64,
    bucket: Mutex<Bucket>,
}

impl Default for BucketRateLimiter {
    fn default() -> Self {
        Self::from_valid(&BucketStrategy::default())
    }
}

impl BucketRateLimiter {
    /// Build a bucket from `strategy`, rejecting it if [`BucketStrategy::validate`] fails.
    pub fn new(strategy: &BucketStrategy) -> ModelResult<Self> {
        strategy.validate()?;
        Ok(Self::from_valid(strategy))
    }

    fn from_valid(strategy: &BucketStrategy) -> Self {
        let burst = f64::from(strategy.burst);
        Self {
            qps: strategy.qps,
            burst,
            bucket: Mutex::new(Bucket {
                tokens: burst,
                last: None,
            }),
        }
    }
}

impl RateLimiter for BucketRateLimiter {
    fn when(&self, _key: &str) -> Duration {
        let mut b = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();

        if let Some(last) = b.last {
            let refill = now.saturating_duration_since(last).as_secs_f64() * self.qps;
            b.tokens = (b.tokens + refill).min(self.burst);
        }
        b.last = Some(now);
        b.tokens -= 1.0;

        if b.tokens >= 0.0 {
            return Duration::ZERO;
        }
        // Overdraft is bounded by the number of waiting callers, so the wait stays finite.
        Duration::try_from_secs_f64(-b.tokens / self.qps).unwrap_or(Duration::MAX)
    }

    fn forget(&self, _key: &str) {}

    fn num_requeues(&self, _key: &str) -> u32 {
        0
    }
}
