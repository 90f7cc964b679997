use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[cfg(feature = "schema")]
use schemars::JsonSchema;

use crate::error::{ModelError, ModelResult};

/// Controls how random jitter is applied to per-key retry delays.
///
/// Jitter spreads retries of keys that failed together, so that a burst of
/// failures does not turn into a burst of simultaneous retries.
///
/// Strategies:
/// - `None`: no jitter, delays are deterministic (default).
/// - `Full`: delay is sampled from `[0, base]`.
/// - `Equal`: delay is sampled from `[base/2, base]`.
/// - `Decorrelated`: delay is sampled from `[first, prev * 3]`, capped at the maximum.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub enum JitterStrategy {
    #[default]
    None,
    Full,
    Equal,
    Decorrelated,
}

impl FromStr for JitterStrategy {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(JitterStrategy::None),
            "full" => Ok(JitterStrategy::Full),
            "equal" => Ok(JitterStrategy::Equal),
            "decorrelated" => Ok(JitterStrategy::Decorrelated),
            other => Err(ModelError::UnknownJitter(other.to_string())),
        }
    }
}
