//! Error types for the codec.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while encoding or decoding records and index keys.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A float value was NaN or infinite.
    ///
    /// Non-finite floats have no deterministic encoding, so they are
    /// rejected at encode time.
    #[error("non-finite float value cannot be encoded")]
    NonFiniteFloat,

    /// The value's kind has no deterministic ordering and cannot be used
    /// as an index key.
    #[error("kind {kind} has no ordering and cannot be an index key")]
    UnorderedKind {
        /// The offending kind.
        kind: String,
    },

    /// The input ended before the declared length was consumed.
    #[error("unexpected end of input: needed {needed} more bytes")]
    UnexpectedEof {
        /// How many bytes were still required.
        needed: usize,
    },

    /// Bytes remained after the record was fully decoded.
    #[error("trailing bytes after record: {remaining}")]
    TrailingBytes {
        /// How many bytes were left over.
        remaining: usize,
    },

    /// An unknown field kind tag was encountered.
    #[error("unknown field kind tag: {tag}")]
    UnknownKindTag {
        /// The tag byte.
        tag: u8,
    },

    /// A field name or string payload was not valid UTF-8.
    #[error("invalid UTF-8 in {context}")]
    InvalidUtf8 {
        /// What was being decoded.
        context: &'static str,
    },

    /// A fixed-width payload had the wrong length.
    #[error("invalid payload length for {kind}: expected {expected}, got {actual}")]
    InvalidPayloadLength {
        /// The kind being decoded.
        kind: &'static str,
        /// Required length.
        expected: usize,
        /// Observed length.
        actual: usize,
    },

    /// A boolean payload byte was neither 0 nor 1.
    #[error("invalid boolean byte: {byte}")]
    InvalidBool {
        /// The offending byte.
        byte: u8,
    },

    /// Field names were not strictly ascending.
    ///
    /// Encoded records are canonical: fields sorted by name, no duplicates.
    #[error("field {name:?} out of canonical order")]
    OutOfOrderField {
        /// The offending field name.
        name: String,
    },

    /// A field name exceeded the encodable length.
    #[error("field name too long: {len} bytes")]
    FieldNameTooLong {
        /// The name's byte length.
        len: usize,
    },

    /// A field payload exceeded the encodable length.
    #[error("payload too long: {len} bytes")]
    PayloadTooLong {
        /// The payload's byte length.
        len: usize,
    },
}
