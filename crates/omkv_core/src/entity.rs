//! Entity trait: the seam between application structs and flat records.

use crate::error::CoreResult;
use crate::schema::TypeDescriptor;
use omkv_codec::Record;

/// Trait for application types persisted by a repository.
///
/// Implementors provide the structural type description the schema
/// registry validates, plus conversion to and from the flat [`Record`]
/// representation. Conversion is pure; the repository and codec handle
/// all storage concerns.
///
/// # Example
///
/// ```rust,ignore
/// use omkv_codec::{FieldKind, FieldValue, Record};
/// use omkv_core::{CoreError, CoreResult, Entity, TypeDescriptor};
///
/// struct User {
///     id: String,
///     email: String,
///     age: i64,
/// }
///
/// impl Entity for User {
///     fn type_name() -> &'static str {
///         "user"
///     }
///
///     fn descriptor() -> TypeDescriptor {
///         TypeDescriptor::new("user")
///             .primary_key("id", FieldKind::Str)
///             .indexed_field("email", FieldKind::Str)
///             .indexed_field("age", FieldKind::Int)
///     }
///
///     fn to_record(&self) -> CoreResult<Record> {
///         Ok(Record::new()
///             .with("id", self.id.as_str())
///             .with("email", self.email.as_str())
///             .with("age", self.age))
///     }
///
///     fn from_record(record: &Record) -> CoreResult<Self> {
///         Ok(User {
///             id: record
///                 .get("id")
///                 .and_then(|v| v.as_str())
///                 .ok_or_else(|| CoreError::decode("missing id"))?
///                 .to_string(),
///             email: record
///                 .get("email")
///                 .and_then(|v| v.as_str())
///                 .ok_or_else(|| CoreError::decode("missing email"))?
///                 .to_string(),
///             age: record
///                 .get("age")
///                 .and_then(|v| v.as_int())
///                 .ok_or_else(|| CoreError::decode("missing age"))?,
///         })
///     }
/// }
/// ```
pub trait Entity: Sized {
    /// Returns the entity type name.
    ///
    /// Must match the name in [`descriptor`](Self::descriptor); record
    /// keys are derived from it, so it is fixed for the type's lifetime.
    fn type_name() -> &'static str;

    /// Returns the structural type description.
    fn descriptor() -> TypeDescriptor;

    /// Converts this instance to a flat record.
    ///
    /// Must be deterministic: the same logical state yields an equal
    /// record every time.
    fn to_record(&self) -> CoreResult<Record>;

    /// Reconstructs an instance from a flat record.
    ///
    /// The record has already been validated against the schema; missing
    /// or mistyped fields still reachable here should fail with
    /// [`crate::CoreError::Decode`].
    fn from_record(record: &Record) -> CoreResult<Self>;
}
