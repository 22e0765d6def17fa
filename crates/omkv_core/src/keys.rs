//! Storage-key derivation.
//!
//! Record keys: `r:{type}:{pk index bytes}`.
//! Index entry keys: `i:{type}:{field}:{value index bytes}`.
//!
//! Type and field names are validated at schema registration to exclude
//! the ':' separator, so the prefixes of distinct types and fields never
//! collide. Value suffixes use the order-preserving index encoding, which
//! makes an inclusive byte-range scan over one index's keyspace equal to
//! an inclusive value-range lookup.

use crate::error::CoreResult;
use omkv_codec::{index_bytes, FieldValue};

const RECORD_TAG: &[u8] = b"r:";
const INDEX_TAG: &[u8] = b"i:";

/// Derives the storage key of a record from its primary-key value.
pub(crate) fn record_key(type_name: &str, pk: &FieldValue) -> CoreResult<Vec<u8>> {
    Ok(record_key_from_pk_bytes(type_name, &index_bytes(pk)?))
}

/// Derives a record key from already-encoded primary-key bytes.
///
/// Index entries store encoded primary keys as set members, so hydration
/// can rebuild record keys without decoding the value.
pub(crate) fn record_key_from_pk_bytes(type_name: &str, pk_bytes: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(RECORD_TAG.len() + type_name.len() + 1 + pk_bytes.len());
    key.extend_from_slice(RECORD_TAG);
    key.extend_from_slice(type_name.as_bytes());
    key.push(b':');
    key.extend_from_slice(pk_bytes);
    key
}

/// Derives the set key of one index entry.
pub(crate) fn index_entry_key(
    type_name: &str,
    field: &str,
    value: &FieldValue,
) -> CoreResult<Vec<u8>> {
    let mut key = index_prefix(type_name, field);
    key.extend_from_slice(&index_bytes(value)?);
    Ok(key)
}

/// Derives the inclusive byte range covering `[low, high]` of one index.
pub(crate) fn index_range_keys(
    type_name: &str,
    field: &str,
    low: &FieldValue,
    high: &FieldValue,
) -> CoreResult<(Vec<u8>, Vec<u8>)> {
    let prefix = index_prefix(type_name, field);
    let mut low_key = prefix.clone();
    low_key.extend_from_slice(&index_bytes(low)?);
    let mut high_key = prefix;
    high_key.extend_from_slice(&index_bytes(high)?);
    Ok((low_key, high_key))
}

fn index_prefix(type_name: &str, field: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(INDEX_TAG.len() + type_name.len() + field.len() + 2);
    key.extend_from_slice(INDEX_TAG);
    key.extend_from_slice(type_name.as_bytes());
    key.push(b':');
    key.extend_from_slice(field.as_bytes());
    key.push(b':');
    key
}
