use recon_model::KeyError;
use thiserror::Error;

/// Errors returned by [`super::MemorySource`] mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("object {0:?} already exists")]
    AlreadyExists(String),

    #[error("object {0:?} not found")]
    NotFound(String),

    #[error(transparent)]
    Key(#[from] KeyError),
}
