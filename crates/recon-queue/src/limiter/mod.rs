//! Retry pacing for [`crate::WorkQueue::add_rate_limited`].
//!
//! A [`RateLimiter`] answers "how long should this key wait before it is queued again".
//! Limiters are shared between workers and must be internally synchronized.
use std::{sync::Arc, time::Duration};

mod bucket;
pub use bucket::BucketRateLimiter;

mod exponential;
pub use exponential::ExponentialRateLimiter;

mod max_of;
pub use max_of::MaxOfRateLimiter;

/// Per-key retry delay policy.
pub trait RateLimiter: Send + Sync + 'static {
    /// Delay before `key` may be queued again. Counts as one failure of `key`.
    fn when(&self, key: &str) -> Duration;

    /// Drop all state tracked for `key`, typically after a successful sync.
    fn forget(&self, key: &str);

    /// Number of failures tracked for `key` since the last [`RateLimiter::forget`].
    fn num_requeues(&self, key: &str) -> u32;
}

/// Shared handle to a rate limiter.
pub type RateLimiterHandle = Arc<dyn RateLimiter>;

/// Limiter used when the controller is not given one explicitly.
///
/// Combines a per-key exponential backoff (5ms doubling up to 1000s) with an overall
/// token bucket (10 qps, burst 100); the longer of the two delays wins.
pub fn default_controller_rate_limiter() -> RateLimiterHandle {
    Arc::new(MaxOfRateLimiter::new(vec![
        Arc::new(ExponentialRateLimiter::default()),
        Arc::new(BucketRateLimiter::default()),
    ]))
}
