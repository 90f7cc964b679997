use recon_model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("controller {0:?} has no sync function (use with_sync or with_reconciler)")]
    MissingSync(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("worker count must be at least 1, got {0}")]
    InvalidWorkers(usize),

    #[error("controller {0:?} has already been started")]
    AlreadyStarted(String),

    #[error("controller {controller:?} timed out after {timeout_ms}ms waiting for event sources: {pending:?}")]
    CacheSyncTimeout {
        controller: String,
        timeout_ms: u64,
        pending: Vec<String>,
    },
}
