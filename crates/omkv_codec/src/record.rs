//! Flat record representation and its deterministic byte encoding.

use crate::error::{CodecError, CodecResult};
use crate::value::FieldValue;
use std::collections::BTreeMap;

/// The flat, on-store representation of one entity instance.
///
/// A record maps field names to scalar values. Field order is canonical
/// (name-sorted), which together with the deterministic scalar encoding
/// guarantees that encoding the same logical state twice yields
/// byte-identical output.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Builder-style [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Returns the value of a field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Returns true if the record has the field.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates fields in canonical (name) order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

const TAG_STR: u8 = 0;
const TAG_INT: u8 = 1;
const TAG_FLOAT: u8 = 2;
const TAG_BOOL: u8 = 3;
const TAG_TIMESTAMP: u8 = 4;
const TAG_JSON: u8 = 5;

/// Encodes a record to its canonical byte form.
///
/// Layout: `u32` field count, then per field (in name order) a
/// length-prefixed name, a one-byte kind tag, and a length-prefixed
/// payload. Identical records produce identical bytes.
///
/// # Errors
///
/// Fails with [`CodecError::NonFiniteFloat`] on NaN or infinite floats,
/// [`CodecError::FieldNameTooLong`] on names over 64 KiB, and
/// [`CodecError::PayloadTooLong`] on payloads over 4 GiB.
pub fn encode_record(record: &Record) -> CodecResult<Vec<u8>> {
    let mut out = Vec::with_capacity(16 + record.len() * 16);
    out.extend_from_slice(&(record.len() as u32).to_be_bytes());

    for (name, value) in record.fields() {
        let name_len =
            u16::try_from(name.len()).map_err(|_| CodecError::FieldNameTooLong { len: name.len() })?;
        out.extend_from_slice(&name_len.to_be_bytes());
        out.extend_from_slice(name.as_bytes());

        let (tag, payload): (u8, Vec<u8>) = match value {
            FieldValue::Str(s) => (TAG_STR, s.as_bytes().to_vec()),
            FieldValue::Int(i) => (TAG_INT, i.to_be_bytes().to_vec()),
            FieldValue::Float(f) => {
                if !f.is_finite() {
                    return Err(CodecError::NonFiniteFloat);
                }
                (TAG_FLOAT, f.to_bits().to_be_bytes().to_vec())
            }
            FieldValue::Bool(b) => (TAG_BOOL, vec![u8::from(*b)]),
            FieldValue::Timestamp(t) => (TAG_TIMESTAMP, t.to_be_bytes().to_vec()),
            FieldValue::Json(j) => (TAG_JSON, j.as_bytes().to_vec()),
        };
        out.push(tag);
        out.extend_from_slice(&encoded_len(payload.len())?.to_be_bytes());
        out.extend_from_slice(&payload);
    }

    Ok(out)
}

/// Decodes a record from its canonical byte form.
///
/// # Errors
///
/// Fails on truncated input, unknown kind tags, invalid UTF-8,
/// non-canonical field order, or trailing bytes.
pub fn decode_record(bytes: &[u8]) -> CodecResult<Record> {
    let mut cursor = Cursor::new(bytes);
    let count = cursor.read_u32()? as usize;

    let mut record = Record::new();
    let mut last_name: Option<String> = None;

    for _ in 0..count {
        let name_len = cursor.read_u16()? as usize;
        let name = std::str::from_utf8(cursor.read_bytes(name_len)?)
            .map_err(|_| CodecError::InvalidUtf8 {
                context: "field name",
            })?
            .to_string();

        if let Some(prev) = &last_name {
            if name.as_str() <= prev.as_str() {
                return Err(CodecError::OutOfOrderField { name });
            }
        }

        let tag = cursor.read_u8()?;
        let payload_len = cursor.read_u32()? as usize;
        let payload = cursor.read_bytes(payload_len)?;

        let value = match tag {
            TAG_STR => FieldValue::Str(decode_utf8(payload, "string payload")?),
            TAG_INT => FieldValue::Int(decode_i64(payload, "int")?),
            TAG_FLOAT => {
                let f = f64::from_bits(decode_i64(payload, "float")? as u64);
                if !f.is_finite() {
                    return Err(CodecError::NonFiniteFloat);
                }
                FieldValue::Float(f)
            }
            TAG_BOOL => {
                if payload.len() != 1 {
                    return Err(CodecError::InvalidPayloadLength {
                        kind: "bool",
                        expected: 1,
                        actual: payload.len(),
                    });
                }
                match payload[0] {
                    0 => FieldValue::Bool(false),
                    1 => FieldValue::Bool(true),
                    byte => return Err(CodecError::InvalidBool { byte }),
                }
            }
            TAG_TIMESTAMP => FieldValue::Timestamp(decode_i64(payload, "timestamp")?),
            TAG_JSON => FieldValue::Json(decode_utf8(payload, "json payload")?),
            tag => return Err(CodecError::UnknownKindTag { tag }),
        };

        record.set(name.clone(), value);
        last_name = Some(name);
    }

    let remaining = cursor.remaining();
    if remaining != 0 {
        return Err(CodecError::TrailingBytes { remaining });
    }

    Ok(record)
}

fn encoded_len(len: usize) -> CodecResult<u32> {
    u32::try_from(len).map_err(|_| CodecError::PayloadTooLong { len })
}

fn decode_utf8(payload: &[u8], context: &'static str) -> CodecResult<String> {
    std::str::from_utf8(payload)
        .map(str::to_string)
        .map_err(|_| CodecError::InvalidUtf8 { context })
}

fn decode_i64(payload: &[u8], kind: &'static str) -> CodecResult<i64> {
    let arr: [u8; 8] = payload
        .try_into()
        .map_err(|_| CodecError::InvalidPayloadLength {
            kind,
            expected: 8,
            actual: payload.len(),
        })?;
    Ok(i64::from_be_bytes(arr))
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn read_bytes(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(CodecError::UnexpectedEof {
                needed: len - self.remaining(),
            });
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_u8(&mut self) -> CodecResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_u16(&mut self) -> CodecResult<u16> {
        let arr: [u8; 2] = self.read_bytes(2)?.try_into().unwrap();
        Ok(u16::from_be_bytes(arr))
    }

    fn read_u32(&mut self) -> CodecResult<u32> {
        let arr: [u8; 4] = self.read_bytes(4)?.try_into().unwrap();
        Ok(u32::from_be_bytes(arr))
    }
}
