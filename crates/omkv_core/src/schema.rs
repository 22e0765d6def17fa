//! Schema registry: validated, immutable field layouts per entity type.

use crate::entity::Entity;
use crate::error::{CoreResult, SchemaError};
use omkv_codec::FieldKind;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// One persisted field of an entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Semantic type of the field.
    pub kind: FieldKind,
    /// Whether the field carries a secondary index.
    pub indexed: bool,
    /// Whether the field is the primary key.
    pub primary_key: bool,
}

/// The application-supplied structural description of an entity type.
///
/// Built field by field, then validated into a [`Schema`] at
/// registration time.
///
/// # Example
///
/// ```rust,ignore
/// let desc = TypeDescriptor::new("user")
///     .primary_key("id", FieldKind::Str)
///     .indexed_field("email", FieldKind::Str)
///     .field("age", FieldKind::Int);
/// ```
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    type_name: String,
    fields: Vec<FieldDef>,
}

impl TypeDescriptor {
    /// Starts a descriptor for the named type.
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Adds an unindexed field.
    #[must_use]
    pub fn field(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.push(name, kind, false, false)
    }

    /// Adds an indexed field.
    #[must_use]
    pub fn indexed_field(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.push(name, kind, true, false)
    }

    /// Adds the primary-key field.
    #[must_use]
    pub fn primary_key(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.push(name, kind, false, true)
    }

    fn push(mut self, name: impl Into<String>, kind: FieldKind, indexed: bool, pk: bool) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            kind,
            indexed,
            primary_key: pk,
        });
        self
    }
}

/// A validated, immutable schema for one entity type.
///
/// Schemas are derived once per type, shared read-only behind an `Arc`,
/// and never mutated after registration.
#[derive(Debug, PartialEq, Eq)]
pub struct Schema {
    type_name: String,
    fields: Vec<FieldDef>,
    primary_key: usize,
}

impl Schema {
    /// Validates a descriptor into a schema.
    pub(crate) fn from_descriptor(desc: TypeDescriptor) -> Result<Self, SchemaError> {
        if desc.type_name.is_empty() {
            return Err(SchemaError::EmptyTypeName);
        }
        validate_name(&desc.type_name)?;

        let mut primary_key = None;
        for (position, field) in desc.fields.iter().enumerate() {
            validate_name(&field.name)?;
            if desc.fields[..position].iter().any(|f| f.name == field.name) {
                return Err(SchemaError::DuplicateField {
                    field: field.name.clone(),
                });
            }
            if (field.indexed || field.primary_key) && !field.kind.is_orderable() {
                return Err(SchemaError::UnindexableField {
                    field: field.name.clone(),
                    kind: field.kind,
                });
            }
            if field.primary_key {
                if primary_key.is_some() {
                    return Err(SchemaError::DuplicatePrimaryKey {
                        type_name: desc.type_name,
                    });
                }
                primary_key = Some(position);
            }
        }

        let primary_key = primary_key.ok_or(SchemaError::MissingPrimaryKey {
            type_name: desc.type_name.clone(),
        })?;

        Ok(Self {
            type_name: desc.type_name,
            fields: desc.fields,
            primary_key,
        })
    }

    /// Returns the entity type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the ordered field list.
    #[must_use]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Returns a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns the primary-key field.
    #[must_use]
    pub fn primary_key(&self) -> &FieldDef {
        &self.fields[self.primary_key]
    }

    /// Iterates the indexed fields.
    pub fn indexed_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.indexed)
    }
}

/// Names flow into storage keys; ':' is the key separator.
fn validate_name(name: &str) -> Result<(), SchemaError> {
    if name.is_empty() || name.contains(':') {
        return Err(SchemaError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Derives and caches schemas from entity type descriptions.
///
/// Registration is idempotent: registering the same type twice yields
/// the same `Arc<Schema>` and no duplicate bookkeeping. Derived schemas
/// are immutable and freely shared across threads.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: RwLock<HashMap<String, Arc<Schema>>>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T`'s type description, returning its validated schema.
    ///
    /// # Errors
    ///
    /// Fails with a [`SchemaError`] if the description has no primary key,
    /// more than one, a duplicate field, or an indexed field whose kind
    /// defines no deterministic ordering.
    pub fn register<T: Entity>(&self) -> CoreResult<Arc<Schema>> {
        if let Some(schema) = self.schemas.read().get(T::type_name()) {
            return Ok(Arc::clone(schema));
        }

        let schema = Arc::new(Schema::from_descriptor(T::descriptor())?);
        let mut schemas = self.schemas.write();
        // Lost a race with another registrar: keep the first entry.
        let entry = schemas
            .entry(schema.type_name().to_string())
            .or_insert(schema);
        Ok(Arc::clone(entry))
    }

    /// Returns the schema registered under `type_name`, if any.
    #[must_use]
    pub fn get(&self, type_name: &str) -> Option<Arc<Schema>> {
        self.schemas.read().get(type_name).map(Arc::clone)
    }

    /// Returns the number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.read().len()
    }

    /// Returns true if no types are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use omkv_codec::Record;

    struct User;

    impl Entity for User {
        fn type_name() -> &'static str {
            "user"
        }

        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::new("user")
                .primary_key("id", FieldKind::Str)
                .indexed_field("email", FieldKind::Str)
                .field("age", FieldKind::Int)
        }

        fn to_record(&self) -> CoreResult<Record> {
            unimplemented!("not exercised in schema tests")
        }

        fn from_record(_: &Record) -> CoreResult<Self> {
            unimplemented!("not exercised in schema tests")
        }
    }

    #[test]
    fn register_derives_schema() {
        let registry = SchemaRegistry::new();
        let schema = registry.register::<User>().unwrap();

        assert_eq!(schema.type_name(), "user");
        assert_eq!(schema.primary_key().name, "id");
        assert_eq!(schema.fields().len(), 3);
        let indexed: Vec<_> = schema.indexed_fields().map(|f| f.name.as_str()).collect();
        assert_eq!(indexed, vec!["email"]);
    }

    #[test]
    fn register_is_idempotent() {
        let registry = SchemaRegistry::new();
        let first = registry.register::<User>().unwrap();
        let second = registry.register::<User>().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn missing_primary_key_fails() {
        let desc = TypeDescriptor::new("thing").field("a", FieldKind::Int);
        let err = Schema::from_descriptor(desc).unwrap_err();
        assert!(matches!(err, SchemaError::MissingPrimaryKey { .. }));
    }

    #[test]
    fn duplicate_primary_key_fails() {
        let desc = TypeDescriptor::new("thing")
            .primary_key("a", FieldKind::Str)
            .primary_key("b", FieldKind::Str);
        let err = Schema::from_descriptor(desc).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicatePrimaryKey { .. }));
    }

    #[test]
    fn duplicate_field_fails() {
        let desc = TypeDescriptor::new("thing")
            .primary_key("id", FieldKind::Str)
            .field("a", FieldKind::Int)
            .field("a", FieldKind::Str);
        let err = Schema::from_descriptor(desc).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField { .. }));
    }

    #[test]
    fn indexed_json_fails() {
        let desc = TypeDescriptor::new("thing")
            .primary_key("id", FieldKind::Str)
            .indexed_field("payload", FieldKind::Json);
        let err = Schema::from_descriptor(desc).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::UnindexableField {
                kind: FieldKind::Json,
                ..
            }
        ));
    }

    #[test]
    fn json_primary_key_fails() {
        let desc = TypeDescriptor::new("thing").primary_key("id", FieldKind::Json);
        assert!(Schema::from_descriptor(desc).is_err());
    }

    #[test]
    fn unindexed_json_field_is_allowed() {
        let desc = TypeDescriptor::new("thing")
            .primary_key("id", FieldKind::Str)
            .field("payload", FieldKind::Json);
        assert!(Schema::from_descriptor(desc).is_ok());
    }

    #[test]
    fn reserved_separator_in_name_fails() {
        let desc = TypeDescriptor::new("thing")
            .primary_key("id", FieldKind::Str)
            .field("a:b", FieldKind::Int);
        let err = Schema::from_descriptor(desc).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidName { .. }));
    }

    #[test]
    fn schema_error_wraps_into_core_error() {
        let registry = SchemaRegistry::new();

        struct Broken;
        impl Entity for Broken {
            fn type_name() -> &'static str {
                "broken"
            }
            fn descriptor() -> TypeDescriptor {
                TypeDescriptor::new("broken").field("a", FieldKind::Int)
            }
            fn to_record(&self) -> CoreResult<Record> {
                unimplemented!()
            }
            fn from_record(_: &Record) -> CoreResult<Self> {
                unimplemented!()
            }
        }

        let err = registry.register::<Broken>().unwrap_err();
        assert!(matches!(err, CoreError::Schema(_)));
        assert!(registry.is_empty());
    }
}
