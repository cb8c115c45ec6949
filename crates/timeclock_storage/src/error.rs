//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A persisted value could not be parsed.
    #[error("value for key {key:?} is corrupted: {message}")]
    Corrupted {
        /// The key holding the bad value.
        key: String,
        /// Parser message.
        message: String,
    },

    /// A value could not be serialized before writing.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The key is not usable as a storage name.
    #[error("invalid key: {0:?}")]
    InvalidKey(String),
}
