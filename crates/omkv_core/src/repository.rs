//! Repository: the CRUD and query surface application code calls.

use crate::codec;
use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::index::IndexMaintainer;
use crate::keys;
use crate::query::{self, Predicate};
use crate::schema::{Schema, SchemaRegistry};
use omkv_codec::{FieldValue, Record};
use omkv_store::{Context, KvStore, Precondition, StoreError, Version};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// A record read together with its store version.
struct VersionedRecord {
    record: Record,
    version: Version,
}

/// Typed repository over one entity type.
///
/// The repository is the only component application code calls directly.
/// Records are written with conditional store writes; same-key mutations
/// serialize through optimistic concurrency (a losing writer gets
/// [`CoreError::Conflict`] and retries with a fresh read). Index entries
/// are reconciled after the record write, so the record is always the
/// authority: an index entry left stale by a partial failure can only
/// produce a false-positive candidate, which query evaluation filters
/// out by re-checking the predicate against the stored record.
///
/// # Example
///
/// ```rust,ignore
/// let registry = SchemaRegistry::new();
/// let users: Repository<User> = Repository::open(store, &registry)?;
///
/// let ctx = Context::background();
/// users.create(&ctx, &User { id: "1".into(), email: "a@x.com".into(), age: 30 })?;
/// let found = users.get(&ctx, &FieldValue::Str("1".into()))?;
/// let adults = users.query(&ctx, &Predicate::between("age", 18i64, 120i64))?;
/// ```
pub struct Repository<T: Entity> {
    store: Arc<dyn KvStore>,
    schema: Arc<Schema>,
    indexes: IndexMaintainer,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity> Repository<T> {
    /// Opens a repository, registering `T`'s schema.
    pub fn open(store: Arc<dyn KvStore>, registry: &SchemaRegistry) -> CoreResult<Self> {
        let schema = registry.register::<T>()?;
        Ok(Self {
            indexes: IndexMaintainer::new(Arc::clone(&store)),
            store,
            schema,
            _marker: PhantomData,
        })
    }

    /// Returns the registered schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Creates a new entity, returning its primary-key value.
    ///
    /// The existence check is a conditional write against the store, not
    /// a prior read, so two racing creators cannot both win.
    ///
    /// # Errors
    ///
    /// [`CoreError::DuplicateKey`] if a record already exists at the key.
    pub fn create(&self, ctx: &Context, entity: &T) -> CoreResult<FieldValue> {
        let record = codec::encode(&self.schema, entity)?;
        let pk = self.primary_key_of(&record)?.clone();
        let key = keys::record_key(self.schema.type_name(), &pk)?;
        let bytes = codec::encode_bytes(&record)?;

        match self.store.put(ctx, &key, &bytes, Precondition::Absent) {
            Ok(_) => {}
            Err(StoreError::KeyExists { .. }) => {
                return Err(CoreError::DuplicateKey { key: pk.to_string() });
            }
            Err(err) => return Err(err.into()),
        }

        self.indexes.insert(ctx, &self.schema, &record)?;
        debug!(entity = self.schema.type_name(), key = %pk, "created");
        Ok(pk)
    }

    /// Fetches an entity by primary key.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] if no record exists at the key.
    pub fn get(&self, ctx: &Context, pk: &FieldValue) -> CoreResult<T> {
        let versioned = self.read(ctx, pk)?;
        codec::decode(&self.schema, &versioned.record)
    }

    /// Applies `mutate` to the current entity state and writes the result
    /// back, conditional on the version read.
    ///
    /// One attempt only: a losing writer gets [`CoreError::Conflict`] and
    /// decides whether to retry with a fresh read. The primary key is
    /// immutable; a mutator changing it is rejected before any write.
    pub fn update(
        &self,
        ctx: &Context,
        pk: &FieldValue,
        mutate: impl FnOnce(&mut T),
    ) -> CoreResult<T> {
        let VersionedRecord {
            record: old,
            version,
        } = self.read(ctx, pk)?;

        let mut entity: T = codec::decode(&self.schema, &old)?;
        mutate(&mut entity);
        let new = codec::encode(&self.schema, &entity)?;

        let pk_field = &self.schema.primary_key().name;
        if new.get(pk_field) != old.get(pk_field) {
            return Err(CoreError::ImmutablePrimaryKey {
                field: pk_field.clone(),
            });
        }

        let key = keys::record_key(self.schema.type_name(), pk)?;
        let bytes = codec::encode_bytes(&new)?;
        match self
            .store
            .put(ctx, &key, &bytes, Precondition::Version(version))
        {
            Ok(_) => {}
            Err(StoreError::VersionMismatch { .. }) => {
                return Err(CoreError::Conflict { key: pk.to_string() });
            }
            Err(err) => return Err(err.into()),
        }

        self.indexes.update(ctx, &self.schema, &old, &new)?;
        debug!(entity = self.schema.type_name(), key = %pk, "updated");
        Ok(entity)
    }

    /// Deletes an entity by primary key.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] if the record is already absent;
    /// [`CoreError::Conflict`] if a concurrent writer touched the record
    /// between the read and the conditional delete.
    pub fn delete(&self, ctx: &Context, pk: &FieldValue) -> CoreResult<()> {
        // Read first: index entries are derived from the stored field values.
        let VersionedRecord { record, version } = self.read(ctx, pk)?;
        let key = keys::record_key(self.schema.type_name(), pk)?;

        match self.store.delete(ctx, &key, Precondition::Version(version)) {
            Ok(_) => {}
            Err(StoreError::VersionMismatch { .. }) => {
                return Err(CoreError::Conflict { key: pk.to_string() });
            }
            Err(err) => return Err(err.into()),
        }

        self.indexes.remove(ctx, &self.schema, &record)?;
        debug!(entity = self.schema.type_name(), key = %pk, "deleted");
        Ok(())
    }

    /// Evaluates a predicate and returns the matching entities.
    ///
    /// Indexed leaves resolve through index lookups, intersected smallest
    /// set first; leaves on unindexed fields are applied as a post-filter
    /// after hydration. A predicate with no indexed leaf fails with
    /// [`CoreError::UnboundedQuery`].
    ///
    /// Result order is unspecified. Callers needing an order must sort.
    pub fn query(&self, ctx: &Context, predicate: &Predicate) -> CoreResult<Vec<T>> {
        let candidates = query::plan(ctx, &self.indexes, &self.schema, predicate)?;

        let mut results = Vec::with_capacity(candidates.len());
        for pk_bytes in candidates {
            let key = keys::record_key_from_pk_bytes(self.schema.type_name(), &pk_bytes);
            // A record deleted between intersection and hydration is
            // simply no longer a match.
            let Some((bytes, _)) = self.store.get(ctx, &key)? else {
                continue;
            };
            let record = codec::decode_bytes(&self.schema, &bytes)?;
            // The record is the authority: re-check the whole predicate,
            // not just the deferred leaves, so an index entry that has
            // drifted from the stored value is a false positive, never a
            // wrong result.
            if predicate.matches(&record) {
                results.push(codec::decode(&self.schema, &record)?);
            }
        }
        Ok(results)
    }

    fn read(&self, ctx: &Context, pk: &FieldValue) -> CoreResult<VersionedRecord> {
        let key = keys::record_key(self.schema.type_name(), pk)?;
        match self.store.get(ctx, &key)? {
            None => Err(CoreError::NotFound { key: pk.to_string() }),
            Some((bytes, version)) => Ok(VersionedRecord {
                record: codec::decode_bytes(&self.schema, &bytes)?,
                version,
            }),
        }
    }

    fn primary_key_of<'r>(&self, record: &'r Record) -> CoreResult<&'r FieldValue> {
        let pk = self.schema.primary_key();
        record.get(&pk.name).ok_or_else(|| {
            CoreError::invalid_record(format!("missing primary-key field {:?}", pk.name))
        })
    }
}
