use std::time::Duration;

use serde::{Deserialize, Serialize};

#[cfg(feature = "schema")]
use schemars::JsonSchema;

use crate::{
    error::{ModelError, ModelResult},
    strategy::{BackoffStrategy, BucketStrategy},
};

/// Declarative configuration of one controller instance.
///
/// `ControllerConfig` describes *how* keys are scheduled, not *what* the controller does:
/// - parallelism (`workers`)
/// - periodic reconciliation (`resync_period_ms`)
/// - start-up gating (`cache_sync_timeout_ms`)
/// - retry pacing (`backoff`, `bucket`)
///
/// Every field has a default, so partial documents deserialize.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct ControllerConfig {
    /// Number of concurrent workers passed to `run`.
    pub workers: usize,
    /// Interval of the resync timer in milliseconds; `None` disables it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resync_period_ms: Option<u64>,
    /// How long `run` waits for event sources to report initial sync.
    pub cache_sync_timeout_ms: u64,
    /// Per-key retry backoff.
    pub backoff: BackoffStrategy,
    /// Overall retry rate limit; `None` leaves only the per-key backoff.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<BucketStrategy>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            resync_period_ms: None,
            cache_sync_timeout_ms: 600_000,
            backoff: BackoffStrategy::default(),
            bucket: Some(BucketStrategy::default()),
        }
    }
}

impl ControllerConfig {
    /// Resync interval as a [`Duration`], if enabled.
    pub fn resync_period(&self) -> Option<Duration> {
        self.resync_period_ms.map(Duration::from_millis)
    }

    /// Cache sync timeout as a [`Duration`].
    pub fn cache_sync_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_sync_timeout_ms)
    }

    /// Validate the configuration.
    ///
    /// Rules:
    /// - at least one worker;
    /// - resync period, when set, is not zero;
    /// - cache sync timeout is not zero;
    /// - backoff and bucket strategies are valid.
    pub fn validate(&self) -> ModelResult<()> {
        if self.workers == 0 {
            return Err(ModelError::Invalid("workers must be at least 1".into()));
        }
        if self.resync_period_ms == Some(0) {
            return Err(ModelError::Invalid(
                "resyncPeriodMs cannot be zero (omit it to disable resync)".into(),
            ));
        }
        if self.cache_sync_timeout_ms == 0 {
            return Err(ModelError::Invalid("cacheSyncTimeoutMs must be positive".into()));
        }
        self.backoff.validate()?;
        if let Some(bucket) = &self.bucket {
            bucket.validate()?;
        }
        Ok(())
    }
}
