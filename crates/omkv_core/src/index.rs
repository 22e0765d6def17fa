//! Index maintainer: keeps per-field secondary index entries consistent
//! with record mutations.
//!
//! Each index entry is an independent store-level set keyed by
//! `(type, field, value)` and holding encoded primary keys. Mutations go
//! through the store's concurrency-safe set add/remove, so concurrent
//! writers touching the same entry never lose each other's update and no
//! client-side read-modify-write exists to race.
//!
//! The maintainer never retries: the first store error is returned and
//! the state is left recoverable — the repository re-derives correct
//! entries from the authoritative record on its retry path.

use crate::error::{CoreError, CoreResult};
use crate::keys;
use crate::schema::{FieldDef, Schema};
use omkv_codec::{index_bytes, FieldValue, Record};
use omkv_store::{Context, KvStore};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

/// Maintains and answers secondary indexes for all entity types.
pub struct IndexMaintainer {
    store: Arc<dyn KvStore>,
}

impl IndexMaintainer {
    /// Creates a maintainer over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Adds the record's primary key to every indexed field's entry.
    ///
    /// Idempotent: re-inserting an already-present key is a no-op.
    pub fn insert(&self, ctx: &Context, schema: &Schema, record: &Record) -> CoreResult<()> {
        let pk_bytes = primary_key_bytes(schema, record)?;
        for field in schema.indexed_fields() {
            let value = indexed_value(schema, record, field)?;
            let key = keys::index_entry_key(schema.type_name(), &field.name, value)?;
            self.store.set_add(ctx, &key, &pk_bytes)?;
        }
        Ok(())
    }

    /// Removes the record's primary key from every indexed field's entry.
    ///
    /// Entries left empty are pruned by the store.
    pub fn remove(&self, ctx: &Context, schema: &Schema, record: &Record) -> CoreResult<()> {
        let pk_bytes = primary_key_bytes(schema, record)?;
        for field in schema.indexed_fields() {
            let value = indexed_value(schema, record, field)?;
            let key = keys::index_entry_key(schema.type_name(), &field.name, value)?;
            self.store.set_remove(ctx, &key, &pk_bytes)?;
        }
        Ok(())
    }

    /// Reconciles entries after a record mutation.
    ///
    /// Only fields whose value changed are touched, so the cost is bounded
    /// by the number of changed indexed fields, not the schema width.
    pub fn update(
        &self,
        ctx: &Context,
        schema: &Schema,
        old: &Record,
        new: &Record,
    ) -> CoreResult<()> {
        let pk_bytes = primary_key_bytes(schema, new)?;
        for field in schema.indexed_fields() {
            let old_value = indexed_value(schema, old, field)?;
            let new_value = indexed_value(schema, new, field)?;
            // "Unchanged" must mean equal under the entry-key ordering,
            // not PartialEq: -0.0 == 0.0 but their float keys differ.
            if old_value.compare(new_value) == Some(Ordering::Equal) {
                continue;
            }
            let old_key = keys::index_entry_key(schema.type_name(), &field.name, old_value)?;
            self.store.set_remove(ctx, &old_key, &pk_bytes)?;
            let new_key = keys::index_entry_key(schema.type_name(), &field.name, new_value)?;
            self.store.set_add(ctx, &new_key, &pk_bytes)?;
        }
        Ok(())
    }

    /// Returns the encoded primary keys of entities whose `field` equals
    /// `value`.
    ///
    /// Read-only; an absent entry yields an empty set, never an error.
    pub fn lookup(
        &self,
        ctx: &Context,
        schema: &Schema,
        field: &str,
        value: &FieldValue,
    ) -> CoreResult<HashSet<Vec<u8>>> {
        let field = indexed_field(schema, field, value.kind())?;
        let key = keys::index_entry_key(schema.type_name(), &field.name, value)?;
        Ok(self.store.set_members(ctx, &key)?.into_iter().collect())
    }

    /// Returns the encoded primary keys of entities whose `field` falls
    /// within `[low, high]`, inclusive, under the field's declared
    /// ordering.
    pub fn range_lookup(
        &self,
        ctx: &Context,
        schema: &Schema,
        field: &str,
        low: &FieldValue,
        high: &FieldValue,
    ) -> CoreResult<HashSet<Vec<u8>>> {
        let field = indexed_field(schema, field, low.kind())?;
        if high.kind() != field.kind {
            return Err(CoreError::TypeMismatch {
                field: field.name.clone(),
                expected: field.kind,
                actual: high.kind(),
            });
        }

        let (low_key, high_key) =
            keys::index_range_keys(schema.type_name(), &field.name, low, high)?;
        let mut result = HashSet::new();
        for entry_key in self.store.scan_sets(ctx, &low_key, &high_key)? {
            result.extend(self.store.set_members(ctx, &entry_key)?);
        }
        Ok(result)
    }

    /// Cardinality probe for an equality entry.
    pub fn cardinality(
        &self,
        ctx: &Context,
        schema: &Schema,
        field: &str,
        value: &FieldValue,
    ) -> CoreResult<usize> {
        let field = indexed_field(schema, field, value.kind())?;
        let key = keys::index_entry_key(schema.type_name(), &field.name, value)?;
        Ok(self.store.set_len(ctx, &key)?)
    }

    /// Cardinality probe for a range of entries.
    pub fn range_cardinality(
        &self,
        ctx: &Context,
        schema: &Schema,
        field: &str,
        low: &FieldValue,
        high: &FieldValue,
    ) -> CoreResult<usize> {
        let field = indexed_field(schema, field, low.kind())?;
        let (low_key, high_key) =
            keys::index_range_keys(schema.type_name(), &field.name, low, high)?;
        let mut total = 0;
        for entry_key in self.store.scan_sets(ctx, &low_key, &high_key)? {
            total += self.store.set_len(ctx, &entry_key)?;
        }
        Ok(total)
    }
}

fn primary_key_bytes(schema: &Schema, record: &Record) -> CoreResult<Vec<u8>> {
    let pk = schema.primary_key();
    let value = record.get(&pk.name).ok_or_else(|| {
        CoreError::invalid_record(format!("missing primary-key field {:?}", pk.name))
    })?;
    Ok(index_bytes(value)?)
}

fn indexed_value<'r>(
    schema: &Schema,
    record: &'r Record,
    field: &FieldDef,
) -> CoreResult<&'r FieldValue> {
    record.get(&field.name).ok_or_else(|| {
        CoreError::invalid_record(format!(
            "{}: missing indexed field {:?}",
            schema.type_name(),
            field.name
        ))
    })
}

fn indexed_field<'s>(
    schema: &'s Schema,
    name: &str,
    value_kind: omkv_codec::FieldKind,
) -> CoreResult<&'s FieldDef> {
    let field = schema.field(name).ok_or_else(|| CoreError::UnknownField {
        field: name.to_string(),
    })?;
    if !field.indexed {
        return Err(CoreError::UnindexedField {
            field: name.to_string(),
        });
    }
    if value_kind != field.kind {
        return Err(CoreError::TypeMismatch {
            field: name.to_string(),
            expected: field.kind,
            actual: value_kind,
        });
    }
    Ok(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TypeDescriptor;
    use omkv_codec::FieldKind;
    use omkv_store::InMemoryStore;

    fn schema() -> Schema {
        Schema::from_descriptor(
            TypeDescriptor::new("user")
                .primary_key("id", FieldKind::Str)
                .indexed_field("email", FieldKind::Str)
                .indexed_field("age", FieldKind::Int)
                .field("name", FieldKind::Str),
        )
        .unwrap()
    }

    fn record(id: &str, email: &str, age: i64) -> Record {
        Record::new()
            .with("id", id)
            .with("email", email)
            .with("age", age)
            .with("name", "someone")
    }

    fn setup() -> (IndexMaintainer, Arc<InMemoryStore>, Schema, Context) {
        let store = Arc::new(InMemoryStore::new());
        let maintainer = IndexMaintainer::new(Arc::clone(&store) as Arc<dyn KvStore>);
        (maintainer, store, schema(), Context::background())
    }

    fn pk_set(ids: &[&str]) -> HashSet<Vec<u8>> {
        ids.iter().map(|id| id.as_bytes().to_vec()).collect()
    }

    #[test]
    fn insert_then_lookup() {
        let (maintainer, _, schema, ctx) = setup();
        maintainer
            .insert(&ctx, &schema, &record("1", "a@x.com", 30))
            .unwrap();

        let found = maintainer
            .lookup(&ctx, &schema, "age", &FieldValue::Int(30))
            .unwrap();
        assert_eq!(found, pk_set(&["1"]));
    }

    #[test]
    fn insert_is_idempotent() {
        let (maintainer, store, schema, ctx) = setup();
        let r = record("1", "a@x.com", 30);
        maintainer.insert(&ctx, &schema, &r).unwrap();
        maintainer.insert(&ctx, &schema, &r).unwrap();

        assert_eq!(
            maintainer
                .cardinality(&ctx, &schema, "age", &FieldValue::Int(30))
                .unwrap(),
            1
        );
        // One entry per indexed field
        assert_eq!(store.set_count(), 2);
    }

    #[test]
    fn lookup_missing_entry_is_empty() {
        let (maintainer, _, schema, ctx) = setup();
        let found = maintainer
            .lookup(&ctx, &schema, "age", &FieldValue::Int(99))
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn remove_prunes_empty_entries() {
        let (maintainer, store, schema, ctx) = setup();
        let r = record("1", "a@x.com", 30);
        maintainer.insert(&ctx, &schema, &r).unwrap();
        maintainer.remove(&ctx, &schema, &r).unwrap();

        assert!(maintainer
            .lookup(&ctx, &schema, "email", &FieldValue::Str("a@x.com".into()))
            .unwrap()
            .is_empty());
        assert_eq!(store.set_count(), 0);
    }

    #[test]
    fn update_moves_only_changed_fields() {
        let (maintainer, _, schema, ctx) = setup();
        let old = record("1", "a@x.com", 30);
        let new = record("1", "a@x.com", 31);
        maintainer.insert(&ctx, &schema, &old).unwrap();
        maintainer.update(&ctx, &schema, &old, &new).unwrap();

        assert!(maintainer
            .lookup(&ctx, &schema, "age", &FieldValue::Int(30))
            .unwrap()
            .is_empty());
        assert_eq!(
            maintainer
                .lookup(&ctx, &schema, "age", &FieldValue::Int(31))
                .unwrap(),
            pk_set(&["1"])
        );
        // Unchanged field untouched
        assert_eq!(
            maintainer
                .lookup(&ctx, &schema, "email", &FieldValue::Str("a@x.com".into()))
                .unwrap(),
            pk_set(&["1"])
        );
    }

    #[test]
    fn zero_sign_flip_moves_the_float_entry() {
        let store = Arc::new(InMemoryStore::new());
        let maintainer = IndexMaintainer::new(Arc::clone(&store) as Arc<dyn KvStore>);
        let schema = Schema::from_descriptor(
            TypeDescriptor::new("sensor")
                .primary_key("id", FieldKind::Str)
                .indexed_field("reading", FieldKind::Float),
        )
        .unwrap();
        let ctx = Context::background();

        // -0.0 == 0.0 under PartialEq, but their entry keys differ under
        // the total order; the update must still move the entry.
        let old = Record::new().with("id", "1").with("reading", -0.0f64);
        let new = Record::new().with("id", "1").with("reading", 0.0f64);
        maintainer.insert(&ctx, &schema, &old).unwrap();
        maintainer.update(&ctx, &schema, &old, &new).unwrap();

        assert_eq!(
            maintainer
                .lookup(&ctx, &schema, "reading", &FieldValue::Float(0.0))
                .unwrap(),
            pk_set(&["1"])
        );
        assert!(maintainer
            .lookup(&ctx, &schema, "reading", &FieldValue::Float(-0.0))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn shared_value_entry_holds_both_keys() {
        let (maintainer, _, schema, ctx) = setup();
        maintainer
            .insert(&ctx, &schema, &record("1", "a@x.com", 30))
            .unwrap();
        maintainer
            .insert(&ctx, &schema, &record("2", "b@x.com", 30))
            .unwrap();

        let found = maintainer
            .lookup(&ctx, &schema, "age", &FieldValue::Int(30))
            .unwrap();
        assert_eq!(found, pk_set(&["1", "2"]));

        maintainer
            .remove(&ctx, &schema, &record("1", "a@x.com", 30))
            .unwrap();
        let found = maintainer
            .lookup(&ctx, &schema, "age", &FieldValue::Int(30))
            .unwrap();
        assert_eq!(found, pk_set(&["2"]));
    }

    #[test]
    fn range_lookup_is_inclusive() {
        let (maintainer, _, schema, ctx) = setup();
        for (id, age) in [("1", 10), ("2", 20), ("3", 30), ("4", 40)] {
            maintainer
                .insert(&ctx, &schema, &record(id, &format!("{id}@x.com"), age))
                .unwrap();
        }

        let found = maintainer
            .range_lookup(&ctx, &schema, "age", &FieldValue::Int(20), &FieldValue::Int(30))
            .unwrap();
        assert_eq!(found, pk_set(&["2", "3"]));
    }

    #[test]
    fn range_lookup_spans_negative_values() {
        let (maintainer, _, schema, ctx) = setup();
        for (id, age) in [("1", -5), ("2", 0), ("3", 5)] {
            maintainer
                .insert(&ctx, &schema, &record(id, &format!("{id}@x.com"), age))
                .unwrap();
        }

        let found = maintainer
            .range_lookup(&ctx, &schema, "age", &FieldValue::Int(-10), &FieldValue::Int(1))
            .unwrap();
        assert_eq!(found, pk_set(&["1", "2"]));
    }

    #[test]
    fn unindexed_field_is_rejected() {
        let (maintainer, _, schema, ctx) = setup();
        let err = maintainer
            .lookup(&ctx, &schema, "name", &FieldValue::Str("someone".into()))
            .unwrap_err();
        assert!(matches!(err, CoreError::UnindexedField { .. }));

        let err = maintainer
            .range_lookup(
                &ctx,
                &schema,
                "name",
                &FieldValue::Str("a".into()),
                &FieldValue::Str("z".into()),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::UnindexedField { .. }));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let (maintainer, _, schema, ctx) = setup();
        let err = maintainer
            .lookup(&ctx, &schema, "nope", &FieldValue::Int(1))
            .unwrap_err();
        assert!(matches!(err, CoreError::UnknownField { .. }));
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let (maintainer, _, schema, ctx) = setup();
        let err = maintainer
            .lookup(&ctx, &schema, "age", &FieldValue::Str("30".into()))
            .unwrap_err();
        assert!(matches!(err, CoreError::TypeMismatch { .. }));
    }

    #[test]
    fn cardinality_probes() {
        let (maintainer, _, schema, ctx) = setup();
        for (id, age) in [("1", 30), ("2", 30), ("3", 40)] {
            maintainer
                .insert(&ctx, &schema, &record(id, &format!("{id}@x.com"), age))
                .unwrap();
        }

        assert_eq!(
            maintainer
                .cardinality(&ctx, &schema, "age", &FieldValue::Int(30))
                .unwrap(),
            2
        );
        assert_eq!(
            maintainer
                .range_cardinality(&ctx, &schema, "age", &FieldValue::Int(0), &FieldValue::Int(100))
                .unwrap(),
            3
        );
    }
}
