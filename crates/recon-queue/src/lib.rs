//! Deduplicating, rate-limited work queue for reconciliation controllers.
//!
//! The queue hands out string keys to workers with three guarantees:
//! - a key is queued at most once (adds of a queued key collapse);
//! - a key is never handed to two workers at once (adds of an in-flight key are deferred until `done`);
//! - a key added while in flight is redelivered once after `done`.
//!
//! Retry pacing is delegated to a [`RateLimiter`].
mod fifo;

mod handle;
pub use handle::QueueHandle;

pub mod limiter;
pub use limiter::{
    BucketRateLimiter, ExponentialRateLimiter, MaxOfRateLimiter, RateLimiter, RateLimiterHandle,
    default_controller_rate_limiter,
};

mod queue;
pub use queue::{MAX_DELAY, WorkQueue};
