//! Error types for wahook-core

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Counter store failure (connection, command, bad value)
    #[error("store error: {0}")]
    Store(String),

    /// Deletion queue failure
    #[error("queue error: {0}")]
    Queue(String),

    /// JSON (de)serialization of queue jobs or webhook payloads
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Caller passed an identifier the operation cannot use
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the failure came from an external backend and may succeed on a later call
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Store(_) | Error::Queue(_))
    }
}
