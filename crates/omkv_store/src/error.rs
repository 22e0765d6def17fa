//! Error types for store backends.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A conditional write with `Precondition::Absent` found the key present.
    #[error("key already exists: {key:?}")]
    KeyExists {
        /// The key that was already present.
        key: Vec<u8>,
    },

    /// A conditional write or delete lost the version race.
    #[error("version mismatch on {key:?}: expected {expected}, current {current:?}")]
    VersionMismatch {
        /// The contended key.
        key: Vec<u8>,
        /// The version the caller witnessed.
        expected: u64,
        /// The version now held by the store, `None` if the key is gone.
        current: Option<u64>,
    },

    /// The call's deadline expired before the operation was applied.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The call's cancellation token was tripped before the operation was applied.
    #[error("operation cancelled")]
    Cancelled,

    /// I/O error from the underlying transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Creates a key-exists error.
    pub fn key_exists(key: impl Into<Vec<u8>>) -> Self {
        Self::KeyExists { key: key.into() }
    }

    /// Creates a version-mismatch error.
    pub fn version_mismatch(key: impl Into<Vec<u8>>, expected: u64, current: Option<u64>) -> Self {
        Self::VersionMismatch {
            key: key.into(),
            expected,
            current,
        }
    }
}
