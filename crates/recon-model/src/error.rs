use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown jitter strategy: {0}")]
    UnknownJitter(String),

    #[error("invalid backoff: {0}")]
    InvalidBackoff(String),

    #[error("invalid bucket: {0}")]
    InvalidBucket(String),

    #[error("invalid model: {0}")]
    Invalid(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
