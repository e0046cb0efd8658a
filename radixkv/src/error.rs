//! Error types for radixkv.

use std::time::Duration;

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A writer was handed a key over the configured limit.
    #[error("Key too long: {len} bytes (max {max})")]
    KeyTooLong {
        /// Length of the rejected key
        len: usize,
        /// Configured limit
        max: usize,
    },

    /// Another update held the writer lock for the whole timeout.
    #[error("Writer busy, gave up after {waited:?}")]
    WriterBusy {
        /// How long the update waited
        waited: Duration,
    },

    /// The update closure gave up.
    #[error("Update aborted: {0}")]
    Aborted(String),
}

impl Error {
    /// Abort an update from inside its closure. Nothing is published.
    pub fn aborted(reason: impl Into<String>) -> Self {
        Error::Aborted(reason.into())
    }
}
