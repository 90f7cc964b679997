use std::time::Duration;

use recon_model::KeyError;
use thiserror::Error;

/// Outcome of a failed sync invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Transient failure, retried with the queue's rate limiter.
    #[error("{reason}")]
    Fail { reason: String },

    /// Explicit request to process the key again after a fixed delay.
    #[error("requeue requested after {after:?}")]
    Requeue { after: Duration },

    /// The handler observed cancellation and gave up.
    #[error("sync canceled")]
    Canceled,
}

impl SyncError {
    pub fn fail(reason: impl Into<String>) -> Self {
        SyncError::Fail {
            reason: reason.into(),
        }
    }

    pub fn requeue_after(after: Duration) -> Self {
        SyncError::Requeue { after }
    }

    /// Whether this error counts as a failure for retries and event reporting.
    pub fn is_failure(&self) -> bool {
        matches!(self, SyncError::Fail { .. })
    }
}

impl From<anyhow::Error> for SyncError {
    fn from(e: anyhow::Error) -> Self {
        SyncError::fail(format!("{e:#}"))
    }
}

impl From<KeyError> for SyncError {
    fn from(e: KeyError) -> Self {
        SyncError::fail(e.to_string())
    }
}

pub type SyncResult = Result<(), SyncError>;
