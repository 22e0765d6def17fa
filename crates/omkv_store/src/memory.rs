//! In-memory store for testing.

use crate::backend::{KvStore, Precondition, Version};
use crate::context::Context;
use crate::error::{StoreError, StoreResult};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};

/// One stored record value with its current version.
#[derive(Debug, Clone)]
struct Slot {
    value: Vec<u8>,
    version: Version,
}

/// An in-memory [`KvStore`].
///
/// Stores records and sets in process memory. Suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral repositories that don't need persistence
///
/// # Thread Safety
///
/// All state sits behind `parking_lot::RwLock`; the store can be shared
/// across threads. Set mutations take the write lock for the whole
/// add/remove, so concurrent callers never lose updates.
///
/// # Example
///
/// ```rust
/// use omkv_store::{Context, InMemoryStore, KvStore, Precondition};
///
/// let store = InMemoryStore::new();
/// let ctx = Context::background();
/// let v = store.put(&ctx, b"k", b"hello", Precondition::Absent).unwrap();
/// let (value, version) = store.get(&ctx, b"k").unwrap().unwrap();
/// assert_eq!(value, b"hello");
/// assert_eq!(version, v);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<BTreeMap<Vec<u8>, Slot>>,
    sets: RwLock<BTreeMap<Vec<u8>, BTreeSet<Vec<u8>>>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of record keys currently stored.
    ///
    /// Useful for testing and debugging.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.records.read().len()
    }

    /// Returns the number of non-empty sets currently stored.
    ///
    /// Useful for testing and debugging.
    #[must_use]
    pub fn set_count(&self) -> usize {
        self.sets.read().len()
    }

    /// Clears all records and sets.
    pub fn clear(&self) {
        self.records.write().clear();
        self.sets.write().clear();
    }
}

impl KvStore for InMemoryStore {
    fn get(&self, ctx: &Context, key: &[u8]) -> StoreResult<Option<(Vec<u8>, Version)>> {
        ctx.check()?;
        Ok(self
            .records
            .read()
            .get(key)
            .map(|slot| (slot.value.clone(), slot.version)))
    }

    fn put(
        &self,
        ctx: &Context,
        key: &[u8],
        value: &[u8],
        precondition: Precondition,
    ) -> StoreResult<Version> {
        ctx.check()?;
        let mut records = self.records.write();
        let current = records.get(key).map(|slot| slot.version);

        match precondition {
            Precondition::None => {}
            Precondition::Absent => {
                if current.is_some() {
                    return Err(StoreError::key_exists(key));
                }
            }
            Precondition::Version(expected) => {
                if current != Some(expected) {
                    return Err(StoreError::version_mismatch(
                        key,
                        expected.as_u64(),
                        current.map(Version::as_u64),
                    ));
                }
            }
        }

        let next = Version::new(current.map_or(1, |v| v.as_u64() + 1));
        records.insert(
            key.to_vec(),
            Slot {
                value: value.to_vec(),
                version: next,
            },
        );
        Ok(next)
    }

    fn delete(&self, ctx: &Context, key: &[u8], precondition: Precondition) -> StoreResult<bool> {
        ctx.check()?;
        let mut records = self.records.write();
        let current = records.get(key).map(|slot| slot.version);

        match precondition {
            Precondition::None => {}
            Precondition::Absent => {
                if current.is_some() {
                    return Err(StoreError::key_exists(key));
                }
            }
            Precondition::Version(expected) => {
                if current != Some(expected) {
                    return Err(StoreError::version_mismatch(
                        key,
                        expected.as_u64(),
                        current.map(Version::as_u64),
                    ));
                }
            }
        }

        Ok(records.remove(key).is_some())
    }

    fn set_add(&self, ctx: &Context, key: &[u8], member: &[u8]) -> StoreResult<bool> {
        ctx.check()?;
        let mut sets = self.sets.write();
        Ok(sets.entry(key.to_vec()).or_default().insert(member.to_vec()))
    }

    fn set_remove(&self, ctx: &Context, key: &[u8], member: &[u8]) -> StoreResult<bool> {
        ctx.check()?;
        let mut sets = self.sets.write();
        let Some(set) = sets.get_mut(key) else {
            return Ok(false);
        };
        let removed = set.remove(member);
        if set.is_empty() {
            sets.remove(key);
        }
        Ok(removed)
    }

    fn set_members(&self, ctx: &Context, key: &[u8]) -> StoreResult<Vec<Vec<u8>>> {
        ctx.check()?;
        Ok(self
            .sets
            .read()
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn set_len(&self, ctx: &Context, key: &[u8]) -> StoreResult<usize> {
        ctx.check()?;
        Ok(self.sets.read().get(key).map_or(0, BTreeSet::len))
    }

    fn scan_sets(&self, ctx: &Context, low: &[u8], high: &[u8]) -> StoreResult<Vec<Vec<u8>>> {
        ctx.check()?;
        if low > high {
            return Ok(Vec::new());
        }
        Ok(self
            .sets
            .read()
            .range(low.to_vec()..=high.to_vec())
            .map(|(key, _)| key.clone())
            .collect())
    }
}
