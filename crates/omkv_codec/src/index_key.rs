//! Order-preserving index-key encoding.
//!
//! Index entries live under keys whose suffix is the indexed field's
//! encoded value. Range lookups scan that keyspace byte-wise, so the
//! encoding must preserve each kind's declared ordering: for any two
//! values of the same kind, `index_bytes(a) < index_bytes(b)` iff
//! `a < b`.

use crate::error::{CodecError, CodecResult};
use crate::value::FieldValue;

const SIGN_BIT: u64 = 1 << 63;

/// Encodes a value to order-preserving index-key bytes.
///
/// - `Str`: raw UTF-8 (byte order equals code-point order)
/// - `Int` / `Timestamp`: big-endian with the sign bit flipped, so
///   negatives sort below positives
/// - `Float`: IEEE-754 total-order transform (flip all bits when
///   negative, flip the sign bit otherwise)
/// - `Bool`: a single 0/1 byte
///
/// # Errors
///
/// Fails with [`CodecError::NonFiniteFloat`] on NaN or infinite floats
/// and [`CodecError::UnorderedKind`] on `Json`, which has no
/// deterministic ordering.
pub fn index_bytes(value: &FieldValue) -> CodecResult<Vec<u8>> {
    match value {
        FieldValue::Str(s) => Ok(s.as_bytes().to_vec()),
        FieldValue::Int(i) | FieldValue::Timestamp(i) => {
            Ok(((*i as u64) ^ SIGN_BIT).to_be_bytes().to_vec())
        }
        FieldValue::Float(f) => {
            if !f.is_finite() {
                return Err(CodecError::NonFiniteFloat);
            }
            let bits = f.to_bits();
            let ordered = if bits & SIGN_BIT != 0 { !bits } else { bits ^ SIGN_BIT };
            Ok(ordered.to_be_bytes().to_vec())
        }
        FieldValue::Bool(b) => Ok(vec![u8::from(*b)]),
        FieldValue::Json(_) => Err(CodecError::UnorderedKind {
            kind: value.kind().to_string(),
        }),
    }
}
