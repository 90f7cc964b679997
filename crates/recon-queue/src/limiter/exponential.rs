use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use rand::Rng;
use recon_model::{BackoffStrategy, JitterStrategy, ModelResult, QueueKey};

use super::RateLimiter;

#[derive(Debug, Default, Clone, Copy)]
struct Attempts {
    failures: u32,
    last: Duration,
}

/// Per-key exponential backoff shaped by a [`JitterStrategy`].
///
/// The n-th failure of a key (0-based) waits `first * factor^n`, capped at `max`.
#[derive(Debug)]
pub struct ExponentialRateLimiter {
    strategy: BackoffStrategy,
    attempts: Mutex<HashMap<QueueKey, Attempts>>,
}

impl Default for ExponentialRateLimiter {
    fn default() -> Self {
        Self::from_valid(BackoffStrategy::default())
    }
}

impl ExponentialRateLimiter {
    /// Build a limiter from `strategy`, rejecting it if [`BackoffStrategy::validate`] fails.
    pub fn new(strategy: BackoffStrategy) -> ModelResult<Self> {
        strategy.validate()?;
        Ok(Self::from_valid(strategy))
    }

    fn from_valid(strategy: BackoffStrategy) -> Self {
        Self {
            strategy,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Un-jittered delay after `failures` previous failures.
    pub fn base_delay(&self, failures: u32) -> Duration {
        let first = self.strategy.first().as_secs_f64();
        let max = self.strategy.max();

        let exp = i32::try_from(failures).unwrap_or(i32::MAX);
        let raw = first * self.strategy.factor.powi(exp);
        if raw >= max.as_secs_f64() {
            return max;
        }
        Duration::try_from_secs_f64(raw).unwrap_or(max)
    }

    fn attempts(&self) -> MutexGuard<'_, HashMap<QueueKey, Attempts>> {
        self.attempts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn jitter(&self, base: Duration, prev: Duration) -> Duration {
        let mut rng = rand::thread_rng();
        let base_s = base.as_secs_f64();

        let secs = match self.strategy.jitter {
            JitterStrategy::None => return base,
            JitterStrategy::Full => rng.gen_range(0.0..=base_s),
            JitterStrategy::Equal => base_s / 2.0 + rng.gen_range(0.0..=base_s / 2.0),
            JitterStrategy::Decorrelated => {
                let lo = self.strategy.first().as_secs_f64();
                let hi = (prev.as_secs_f64() * 3.0).max(lo);
                rng.gen_range(lo..=hi)
                    .min(self.strategy.max().as_secs_f64())
            }
        };
        Duration::try_from_secs_f64(secs).unwrap_or(base)
    }
}

impl RateLimiter for ExponentialRateLimiter {
    fn when(&self, key: &str) -> Duration {
        let mut attempts = self.attempts();
        let entry = attempts.entry(key.to_string()).or_default();

        let base = self.base_delay(entry.failures);
        let delay = self.jitter(base, entry.last);

        entry.failures = entry.failures.saturating_add(1);
        entry.last = delay;
        delay
    }

    fn forget(&self, key: &str) {
        self.attempts().remove(key);
    }

    fn num_requeues(&self, key: &str) -> u32 {
        self.attempts().get(key).map_or(0, |a| a.failures)
    }
}
