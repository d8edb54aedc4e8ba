//! Error types for silly id allocation.

use thiserror::Error;

/// Result type for silly id operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Silly id errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Persistence failed, or the stored mapping is unusable.
    #[error(transparent)]
    Store(#[from] oddbot_storage::Error),

    /// Every value of the id space is taken. Terminal for this allocator.
    #[error("No silly ids left in the {bit_width}-bit namespace")]
    NamespaceExhausted { bit_width: u32 },

    #[error("Invalid gap size {0}: must be between 1 and 10")]
    InvalidGapSize(u32),

    #[error("Invalid user id: {0}")]
    InvalidUserId(String),

    /// The host could not deliver the result.
    #[error(transparent)]
    Notify(#[from] oddbot_core::Error),
}

impl Error {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Error::NamespaceExhausted { .. })
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, Error::Store(e) if e.is_corrupt())
    }

    /// Conditions that disable the silly id feature for the rest of the process.
    pub fn is_fatal(&self) -> bool {
        self.is_exhausted() || self.is_corrupt()
    }
}
