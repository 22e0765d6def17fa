//! Scalar field values and their kinds.

use std::cmp::Ordering;
use std::fmt;

/// The semantic type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// UTF-8 text.
    Str,
    /// Signed 64-bit integer.
    Int,
    /// 64-bit float. Non-finite values are rejected at encode time.
    Float,
    /// Boolean.
    Bool,
    /// Point in time, unix milliseconds.
    Timestamp,
    /// Opaque JSON payload.
    ///
    /// Json is a composite: two payloads can differ textually while being
    /// semantically equal, so the kind defines no deterministic ordering or
    /// equality and cannot be indexed.
    Json,
}

impl FieldKind {
    /// Returns true if values of this kind have a deterministic total
    /// ordering, i.e. the kind can back an index.
    #[must_use]
    pub fn is_orderable(self) -> bool {
        !matches!(self, FieldKind::Json)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Str => "str",
            FieldKind::Int => "int",
            FieldKind::Float => "float",
            FieldKind::Bool => "bool",
            FieldKind::Timestamp => "timestamp",
            FieldKind::Json => "json",
        };
        f.write_str(name)
    }
}

/// A scalar field value.
///
/// This is the value union stored in a flat record. Each variant maps to
/// one [`FieldKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// UTF-8 text.
    Str(String),
    /// Signed 64-bit integer.
    Int(i64),
    /// 64-bit float.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// Unix milliseconds.
    Timestamp(i64),
    /// Raw JSON text.
    Json(String),
}

impl FieldValue {
    /// Returns the kind of this value.
    #[must_use]
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Str(_) => FieldKind::Str,
            FieldValue::Int(_) => FieldKind::Int,
            FieldValue::Float(_) => FieldKind::Float,
            FieldValue::Bool(_) => FieldKind::Bool,
            FieldValue::Timestamp(_) => FieldKind::Timestamp,
            FieldValue::Json(_) => FieldKind::Json,
        }
    }

    /// Returns the text, if this is a `Str`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer, if this is an `Int`.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the float, if this is a `Float`.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the boolean, if this is a `Bool`.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the unix milliseconds, if this is a `Timestamp`.
    #[must_use]
    pub fn as_timestamp(&self) -> Option<i64> {
        match self {
            FieldValue::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Returns the JSON text, if this is a `Json`.
    #[must_use]
    pub fn as_json(&self) -> Option<&str> {
        match self {
            FieldValue::Json(j) => Some(j),
            _ => None,
        }
    }

    /// Compares two values using their kind's declared ordering.
    ///
    /// Returns `None` when the kinds differ or the kind has no ordering.
    /// Floats compare by IEEE-754 total order, matching their index-key
    /// byte encoding.
    #[must_use]
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Str(a), FieldValue::Str(b)) => Some(a.cmp(b)),
            (FieldValue::Int(a), FieldValue::Int(b)) => Some(a.cmp(b)),
            (FieldValue::Float(a), FieldValue::Float(b)) => Some(a.total_cmp(b)),
            (FieldValue::Bool(a), FieldValue::Bool(b)) => Some(a.cmp(b)),
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Str(s) => f.write_str(s),
            FieldValue::Int(i) => write!(f, "{i}"),
            FieldValue::Float(x) => write!(f, "{x}"),
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Timestamp(t) => write!(f, "{t}ms"),
            FieldValue::Json(j) => f.write_str(j),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Str(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Str(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}
