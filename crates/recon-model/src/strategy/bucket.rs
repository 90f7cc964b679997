use serde::{Deserialize, Serialize};

#[cfg(feature = "schema")]
use schemars::JsonSchema;

use crate::error::{ModelError, ModelResult};

/// Overall (not per-key) retry rate limit, as a token bucket.
///
/// `qps` tokens are refilled per second up to `burst`; every rate-limited requeue takes one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct BucketStrategy {
    pub qps: f64,
    pub burst: u32,
}

impl Default for BucketStrategy {
    fn default() -> Self {
        Self {
            qps: 10.0,
            burst: 100,
        }
    }
}

impl BucketStrategy {
    pub fn validate(&self) -> ModelResult<()> {
        if !self.qps.is_finite() || self.qps <= 0.0 {
            return Err(ModelError::InvalidBucket(format!(
                "qps must be positive, got {}",
                self.qps
            )));
        }
        if self.burst == 0 {
            return Err(ModelError::InvalidBucket("burst cannot be zero".into()));
        }
        Ok(())
    }
}
