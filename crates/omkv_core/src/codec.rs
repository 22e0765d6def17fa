//! Schema-validating conversion between entities, records, and bytes.
//!
//! Pure transformations, no side effects. Encode-side mismatches are
//! programmer errors ([`CoreError::InvalidRecord`]); decode-side
//! mismatches mean the stored data drifted from the current schema and
//! surface as [`CoreError::Decode`].

use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::schema::Schema;
use omkv_codec::Record;

/// Converts an entity to a record validated against the schema.
pub fn encode<T: Entity>(schema: &Schema, entity: &T) -> CoreResult<Record> {
    let record = entity.to_record()?;
    validate(schema, &record, CoreError::invalid_record)?;
    Ok(record)
}

/// Converts a validated record back into an entity.
pub fn decode<T: Entity>(schema: &Schema, record: &Record) -> CoreResult<T> {
    validate(schema, record, CoreError::decode)?;
    T::from_record(record)
}

/// Serializes a record to its stored byte form.
pub fn encode_bytes(record: &Record) -> CoreResult<Vec<u8>> {
    Ok(omkv_codec::encode_record(record)?)
}

/// Deserializes stored bytes and validates them against the schema.
///
/// Fails with [`CoreError::Decode`] when the stored representation no
/// longer matches the schema's declared field kinds or lacks the
/// primary-key field.
pub fn decode_bytes(schema: &Schema, bytes: &[u8]) -> CoreResult<Record> {
    let record = omkv_codec::decode_record(bytes)?;
    validate(schema, &record, CoreError::decode)?;
    Ok(record)
}

/// Checks that a record carries exactly the schema's fields with the
/// declared kinds, including the primary key.
fn validate(
    schema: &Schema,
    record: &Record,
    mut error: impl FnMut(String) -> CoreError,
) -> CoreResult<()> {
    for field in schema.fields() {
        match record.get(&field.name) {
            None => {
                return Err(error(format!(
                    "{}: missing field {:?}",
                    schema.type_name(),
                    field.name
                )));
            }
            Some(value) if value.kind() != field.kind => {
                return Err(error(format!(
                    "{}: field {:?} has kind {}, schema declares {}",
                    schema.type_name(),
                    field.name,
                    value.kind(),
                    field.kind
                )));
            }
            Some(_) => {}
        }
    }

    if record.len() != schema.fields().len() {
        let unknown = record
            .fields()
            .map(|(name, _)| name)
            .find(|name| schema.field(name).is_none())
            .unwrap_or("?");
        return Err(error(format!(
            "{}: unknown field {:?}",
            schema.type_name(),
            unknown
        )));
    }

    Ok(())
}
