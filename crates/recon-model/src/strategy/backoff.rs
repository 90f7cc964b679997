use std::time::Duration;

use serde::{Deserialize, Serialize};

#[cfg(feature = "schema")]
use schemars::JsonSchema;

use crate::error::{ModelError, ModelResult};

/// Per-key retry backoff applied when a sync fails.
///
/// The n-th consecutive failure of a key waits `first_ms * factor^n`, capped at `max_ms`,
/// then shaped by `jitter`. A successful sync resets the count.
///
/// Defaults: 5ms first delay, 1000s cap, doubling, no jitter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct BackoffStrategy {
    pub jitter: super::JitterStrategy,
    pub first_ms: u64,
    pub max_ms: u64,
    pub factor: f64,
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self {
            jitter: super::JitterStrategy::None,
            first_ms: 5,
            max_ms: 1_000_000,
            factor: 2.0,
        }
    }
}

impl BackoffStrategy {
    /// Delay before the first retry.
    #[inline]
    pub fn first(&self) -> Duration {
        Duration::from_millis(self.first_ms)
    }

    /// Upper bound for any retry delay.
    #[inline]
    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }

    /// Validate the strategy.
    ///
    /// Rules:
    /// - `factor` is finite and `>= 1.0`;
    /// - `first_ms <= max_ms`.
    pub fn validate(&self) -> ModelResult<()> {
        if !self.factor.is_finite() || self.factor < 1.0 {
            return Err(ModelError::InvalidBackoff(format!(
                "factor must be >= 1.0, got {}",
                self.factor
            )));
        }
        if self.first_ms > self.max_ms {
            return Err(ModelError::InvalidBackoff(format!(
                "firstMs ({}) exceeds maxMs ({})",
                self.first_ms, self.max_ms
            )));
        }
        Ok(())
    }
}
