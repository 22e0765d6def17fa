//! # omkv Codec
//!
//! Deterministic record and index-key encoding for omkv.
//!
//! This crate provides the byte representations the object-mapping layer
//! stores:
//! - flat records: field-name-sorted, length-prefixed scalar encoding
//!   where identical inputs produce identical bytes
//! - index keys: order-preserving scalar encoding so byte-wise key
//!   comparison equals the field kind's declared ordering
//!
//! ## Determinism rules
//!
//! - Fields are sorted by name; duplicates are impossible
//! - Integers and timestamps are fixed-width big-endian
//! - Non-finite floats are rejected
//! - Strings must be UTF-8
//!
//! ## Usage
//!
//! ```
//! use omkv_codec::{decode_record, encode_record, Record};
//!
//! let record = Record::new().with("email", "a@x.com").with("age", 30i64);
//! let bytes = encode_record(&record).unwrap();
//! assert_eq!(decode_record(&bytes).unwrap(), record);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod index_key;
mod record;
mod value;

pub use error::{CodecError, CodecResult};
pub use index_key::index_bytes;
pub use record::{decode_record, encode_record, Record};
pub use value::{FieldKind, FieldValue};
