//! Error types for the object-mapping core.

use omkv_codec::{CodecError, FieldKind};
use omkv_store::StoreError;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while validating an entity type description.
///
/// Schema errors are fatal: the type description itself is malformed and
/// retrying cannot help.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// The type name was empty.
    #[error("entity type name is empty")]
    EmptyTypeName,

    /// A type or field name contains characters reserved for key derivation.
    #[error("invalid name {name:?}: must be non-empty and must not contain ':'")]
    InvalidName {
        /// The offending name.
        name: String,
    },

    /// Two fields share a name.
    #[error("duplicate field {field:?}")]
    DuplicateField {
        /// The duplicated field name.
        field: String,
    },

    /// No field claims the primary-key role.
    #[error("type {type_name:?} has no primary-key field")]
    MissingPrimaryKey {
        /// The entity type name.
        type_name: String,
    },

    /// More than one field claims the primary-key role.
    #[error("type {type_name:?} declares more than one primary-key field")]
    DuplicatePrimaryKey {
        /// The entity type name.
        type_name: String,
    },

    /// An indexed or primary-key field has a kind with no deterministic
    /// ordering or equality.
    #[error("field {field:?} of kind {kind} cannot be indexed")]
    UnindexableField {
        /// The offending field name.
        field: String,
        /// The field's kind.
        kind: FieldKind,
    },
}

/// Errors that can occur in repository and query operations.
///
/// Every failure carries its taxonomy [`kind`](CoreError::kind) so calling
/// code can branch on recoverability without matching variants.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed entity type description. Fatal, not retried.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Stored data is inconsistent with the current schema. Surfaced to
    /// the caller, never auto-repaired.
    #[error("decode error: {message}")]
    Decode {
        /// Description of the inconsistency.
        message: String,
    },

    /// An entity produced a record that does not match its own schema.
    /// Programmer error.
    #[error("invalid record: {message}")]
    InvalidRecord {
        /// Description of the mismatch.
        message: String,
    },

    /// A predicate value's kind differs from the schema's declared kind.
    #[error("type mismatch on field {field:?}: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The field being tested.
        field: String,
        /// The schema's declared kind.
        expected: FieldKind,
        /// The predicate value's kind.
        actual: FieldKind,
    },

    /// A record already exists at the primary key.
    #[error("duplicate key: {key}")]
    DuplicateKey {
        /// Display form of the primary key.
        key: String,
    },

    /// No record exists at the primary key.
    #[error("not found: {key}")]
    NotFound {
        /// Display form of the primary key.
        key: String,
    },

    /// A conditional write lost the version race. The caller may retry
    /// with a fresh read.
    #[error("write conflict on {key}")]
    Conflict {
        /// Display form of the contended primary key.
        key: String,
    },

    /// An update attempted to change the primary-key field.
    #[error("primary-key field {field:?} is immutable")]
    ImmutablePrimaryKey {
        /// The primary-key field name.
        field: String,
    },

    /// An index operation targeted a field that is not indexed.
    /// Programmer error.
    #[error("field {field:?} is not indexed")]
    UnindexedField {
        /// The field name.
        field: String,
    },

    /// A predicate referenced a field the schema does not declare.
    /// Programmer error.
    #[error("unknown field {field:?}")]
    UnknownField {
        /// The field name.
        field: String,
    },

    /// A predicate tested a field whose kind has no deterministic
    /// ordering or equality. Programmer error.
    #[error("field {field:?} has no ordering and cannot be queried")]
    UnorderedField {
        /// The field name.
        field: String,
    },

    /// The predicate contains no indexed leaf, so answering it would
    /// require a full scan. Programmer error; the engine refuses.
    #[error("query has no indexed predicate; refusing full scan")]
    UnboundedQuery,

    /// The operation's deadline expired. Transient; the caller may retry
    /// with backoff.
    #[error("operation timed out")]
    Timeout,

    /// The operation was cancelled by its caller.
    #[error("operation cancelled")]
    Cancelled,

    /// Store-level failure not covered by the taxonomy above.
    #[error("store error: {0}")]
    Store(StoreError),

    /// Byte-level codec failure.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

/// The taxonomy kind of a [`CoreError`], for branching on recoverability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed type description; fatal.
    Schema,
    /// Stored data inconsistent with the schema; surfaced, not repaired.
    Decode,
    /// Expected business condition: the key already exists.
    DuplicateKey,
    /// Expected business condition: the key does not exist.
    NotFound,
    /// Optimistic-concurrency loss; retry with a fresh read.
    Conflict,
    /// Programmer error (bad predicate, unindexed field, immutable key);
    /// fatal, not retried.
    Usage,
    /// Deadline expired; transient.
    Timeout,
    /// Cancelled by the caller.
    Cancelled,
    /// Underlying store failure.
    Store,
    /// Byte-level codec failure.
    Codec,
}

impl CoreError {
    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates an invalid-record error.
    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }

    /// Returns the taxonomy kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Schema(_) => ErrorKind::Schema,
            CoreError::Decode { .. } => ErrorKind::Decode,
            CoreError::DuplicateKey { .. } => ErrorKind::DuplicateKey,
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::Conflict { .. } => ErrorKind::Conflict,
            CoreError::InvalidRecord { .. }
            | CoreError::TypeMismatch { .. }
            | CoreError::ImmutablePrimaryKey { .. }
            | CoreError::UnindexedField { .. }
            | CoreError::UnknownField { .. }
            | CoreError::UnorderedField { .. }
            | CoreError::UnboundedQuery => ErrorKind::Usage,
            CoreError::Timeout => ErrorKind::Timeout,
            CoreError::Cancelled => ErrorKind::Cancelled,
            CoreError::Store(_) => ErrorKind::Store,
            CoreError::Codec(_) => ErrorKind::Codec,
        }
    }

    /// Returns true if the operation may be retried.
    ///
    /// Conflicts need a fresh read first; timeouts and cancellations may
    /// be re-issued after the caller checks whether the write landed
    /// (create/delete re-issue idempotently, update re-reads anyway).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Conflict | ErrorKind::Timeout | ErrorKind::Cancelled
        )
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DeadlineExceeded => CoreError::Timeout,
            StoreError::Cancelled => CoreError::Cancelled,
            other => CoreError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_timeout_maps_to_timeout() {
        let err = CoreError::from(StoreError::DeadlineExceeded);
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.is_retryable());
    }

    #[test]
    fn store_cancel_maps_to_cancelled() {
        let err = CoreError::from(StoreError::Cancelled);
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn conflict_is_retryable() {
        let err = CoreError::Conflict { key: "1".into() };
        assert!(err.is_retryable());
    }

    #[test]
    fn programmer_errors_are_not_retryable() {
        assert!(!CoreError::UnboundedQuery.is_retryable());
        assert_eq!(CoreError::UnboundedQuery.kind(), ErrorKind::Usage);
        assert!(!CoreError::UnknownField { field: "x".into() }.is_retryable());
    }

    #[test]
    fn schema_error_is_fatal() {
        let err = CoreError::from(SchemaError::EmptyTypeName);
        assert_eq!(err.kind(), ErrorKind::Schema);
        assert!(!err.is_retryable());
    }
}
