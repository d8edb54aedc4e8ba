//! Error types for the storage crate.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Storage error types.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error. The in-memory state is still valid.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file exists but does not hold a valid mapping.
    #[error("Corrupt store {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Error::Corrupt { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

