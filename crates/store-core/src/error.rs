//! Error types for the shared-store layer

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur against the shared store
///
/// The store is multi-writer and only eventually consistent, so callers are
/// expected to treat write failures as best-effort and retry or degrade
/// rather than abort whatever user-visible flow they are in.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend rejected or failed a read
    #[error("store read failed at '{path}': {message}")]
    ReadFailed { path: String, message: String },

    /// The backend rejected or failed a write
    #[error("store write failed at '{path}': {message}")]
    WriteFailed { path: String, message: String },

    /// A value read from the store did not decode into the expected shape
    #[error("malformed value at '{path}': {message}")]
    MalformedValue { path: String, message: String },

    /// A path string could not be parsed
    #[error("invalid store path: {message}")]
    InvalidPath { message: String },

    /// The backend connection is gone
    #[error("store disconnected: {message}")]
    Disconnected { message: String },
}

impl StoreError {
    /// Create a read failure error
    pub fn read_failed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ReadFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a write failure error
    pub fn write_failed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WriteFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a malformed value error
    pub fn malformed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedValue {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an invalid path error
    pub fn invalid_path(message: impl Into<String>) -> Self {
        Self::InvalidPath {
            message: message.into(),
        }
    }
}
