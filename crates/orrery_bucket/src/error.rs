//! Error types for bucket operations.

use std::io;
use thiserror::Error;

/// Result type for bucket operations.
pub type BucketResult<T> = Result<T, BucketError>;

/// Errors that can occur during bucket operations.
#[derive(Debug, Error)]
pub enum BucketError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The key cannot be stored by this bucket.
    #[error("invalid bucket key: {key:?}")]
    InvalidKey {
        /// The rejected key.
        key: String,
    },

    /// A stored value could not be encoded or decoded.
    #[error("codec error for key {key:?}: {message}")]
    Codec {
        /// The key being read or written.
        key: String,
        /// Description of the failure.
        message: String,
    },

    /// The bucket is unavailable.
    #[error("bucket unavailable: {0}")]
    Unavailable(String),
}

impl BucketError {
    /// Creates a codec error.
    pub fn codec(key: impl Into<String>, message: impl ToString) -> Self {
        Self::Codec {
            key: key.into(),
            message: message.to_string(),
        }
    }
}
