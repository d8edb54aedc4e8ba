//! Error types for the core crate.

use thiserror::Error;

use crate::extension::ExtensionError;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Extension lifecycle error.
    #[error(transparent)]
    Extension(#[from] ExtensionError),

    /// A notification could not be delivered.
    #[error("Notification failed: {0}")]
    Notify(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
