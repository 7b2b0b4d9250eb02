//! Error types for covbase.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Input errors
    #[error("Input required and not supplied: {0}")]
    MissingInput(String),

    #[error("Trigger context incomplete: {0}")]
    MissingContext(String),

    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    // Cache errors
    #[error("Cache entry already exists for key: {0}")]
    CacheKeyExists(String),

    #[error("Cache transport error: {0}")]
    CacheTransport(String),

    #[error("Archive error: {0}")]
    Archive(String),

    // Host API errors
    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: check the supplied token")]
    Unauthorized,

    #[error("Network error: {0}")]
    Network(String),

    // Infrastructure errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
