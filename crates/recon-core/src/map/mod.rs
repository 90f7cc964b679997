//! Conversions from model-level strategies into queue runtime policies.
use std::sync::Arc;

use recon_model::{BackoffStrategy, BucketStrategy, ModelResult};
use recon_queue::{
    BucketRateLimiter, ExponentialRateLimiter, MaxOfRateLimiter, RateLimiterHandle,
};

/// Build the rate limiter described by a backoff and an optional bucket strategy.
///
/// With a bucket the per-key backoff and the overall bucket are combined, longest delay wins.
pub fn to_rate_limiter(
    backoff: &BackoffStrategy,
    bucket: Option<&BucketStrategy>,
) -> ModelResult<RateLimiterHandle> {
    let per_key: RateLimiterHandle = Arc::new(ExponentialRateLimiter::new(backoff.clone())?);
    Ok(match bucket {
        Some(b) => Arc::new(MaxOfRateLimiter::new(vec![
            per_key,
            Arc::new(BucketRateLimiter::new(b)?),
        ])),
        None => per_key,
    })
}
