use std::time::Duration;

use super::{RateLimiter, RateLimiterHandle};

/// Combines limiters by taking the longest delay any of them asks for.
pub struct MaxOfRateLimiter {
    limiters: Vec<RateLimiterHandle>,
}

impl MaxOfRateLimiter {
    pub fn new(limiters: Vec<RateLimiterHandle>) -> Self {
        Self { limiters }
    }
}

impl RateLimiter for MaxOfRateLimiter {
    fn when(&self, key: &str) -> Duration {
        // Every child must observe the failure, so no short-circuiting here.
        self.limiters
            .iter()
            .map(|l| l.when(key))
            .max()
            .unwrap_or(Duration::ZERO)
    }

    fn forget(&self, key: &str) {
        for l in &self.limiters {
            l.forget(key);
        }
    }

    fn num_requeues(&self, key: &str) -> u32 {
        self.limiters
            .iter()
            .map(|l| l.num_requeues(key))
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use recon_model::{BackoffStrategy, BucketStrategy};

    use super::*;
    use crate::limiter::{BucketRateLimiter, ExponentialRateLimiter};

    #[tokio::test(start_paused = true)]
    async fn longest_delay_wins() {
        let l = MaxOfRateLimiter::new(vec![
            Arc::new(ExponentialRateLimiter::new(BackoffStrategy {
                first_ms: 1,
                ..Default::default()
            })
            .unwrap()),
            Arc::new(BucketRateLimiter::new(&BucketStrategy { qps: 1.0, burst: 1 }).unwrap()),
        ]);

        assert_eq!(l.when("a"), Duration::from_millis(1));
        assert_eq!(l.when("a"), Duration::from_secs(1));
        assert_eq!(l.num_requeues("a"), 2);

        l.forget("a");
        assert_eq!(l.num_requeues("a"), 0);
    }

    #[test]
    fn empty_combination_never_delays() {
        let l = MaxOfRateLimiter::new(Vec::new());
        assert_eq!(l.when("a"), Duration::ZERO);
        assert_eq!(l.num_requeues("a"), 0);
    }
}
