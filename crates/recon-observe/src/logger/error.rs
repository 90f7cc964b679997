use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("unknown log format {0:?} (expected text, json or journald)")]
    InvalidFormat(String),

    #[error("invalid log filter: {0}")]
    InvalidLevel(String),

    #[error("journald is only available on linux")]
    JournaldNotSupported,

    #[error("journald connection failed: {0}")]
    JournaldInitFailed(String),

    #[error("a global logger is already installed")]
    AlreadyInitialized,
}

pub type LoggerResult<T> = Result<T, LoggerError>;
