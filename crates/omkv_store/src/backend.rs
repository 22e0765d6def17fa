//! Store trait definition.

use crate::context::Context;
use crate::error::StoreResult;
use std::fmt;

/// A per-key revision marker assigned by the store on every successful write.
///
/// Versions are monotonically increasing for a given key and back the
/// optimistic concurrency scheme: conditional writes compare the caller's
/// witnessed version against the store's current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(u64);

impl Version {
    /// Creates a version from a raw revision number.
    #[inline]
    #[must_use]
    pub const fn new(revision: u64) -> Self {
        Self(revision)
    }

    /// Returns the raw revision number.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Condition under which a write or delete is allowed to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// Apply unconditionally.
    None,
    /// Apply only if the key does not exist.
    Absent,
    /// Apply only if the key's current version matches.
    Version(Version),
}

/// The key-value store a repository runs against.
///
/// This is the external collaborator contract: the object-mapping core
/// depends only on these primitives, never on the store's wire protocol
/// or topology.
///
/// # Invariants
///
/// - `put` assigns a version strictly greater than any previously assigned
///   to that key
/// - conditional `put`/`delete` either fully apply or fail without effect
/// - `set_add`/`set_remove` are atomic under concurrent callers: two
///   concurrent mutations of the same set never lose each other's update
/// - `set_remove` prunes a set whose last member was removed, so the key
///   no longer appears in `scan_sets`
/// - every call honors its [`Context`] and fails without effect when the
///   deadline has passed or the token is tripped
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - in-process store used by the test suites
pub trait KvStore: Send + Sync {
    /// Reads the value and current version stored at `key`.
    ///
    /// Returns `None` if the key does not exist.
    fn get(&self, ctx: &Context, key: &[u8]) -> StoreResult<Option<(Vec<u8>, Version)>>;

    /// Writes `value` at `key`, subject to `precondition`.
    ///
    /// Returns the version assigned to the write.
    ///
    /// # Errors
    ///
    /// - [`crate::StoreError::KeyExists`] for `Precondition::Absent` on a
    ///   present key
    /// - [`crate::StoreError::VersionMismatch`] for `Precondition::Version`
    ///   when the current version differs or the key is gone
    fn put(
        &self,
        ctx: &Context,
        key: &[u8],
        value: &[u8],
        precondition: Precondition,
    ) -> StoreResult<Version>;

    /// Deletes `key`, subject to `precondition`.
    ///
    /// Returns whether the key existed. `Precondition::Version` on an
    /// absent or changed key fails with a version mismatch rather than
    /// returning `false`.
    fn delete(&self, ctx: &Context, key: &[u8], precondition: Precondition) -> StoreResult<bool>;

    /// Adds `member` to the set stored at `key`, creating the set if needed.
    ///
    /// Returns whether the member was newly added. Idempotent.
    fn set_add(&self, ctx: &Context, key: &[u8], member: &[u8]) -> StoreResult<bool>;

    /// Removes `member` from the set stored at `key`.
    ///
    /// Returns whether the member was present. A set left empty is pruned.
    fn set_remove(&self, ctx: &Context, key: &[u8], member: &[u8]) -> StoreResult<bool>;

    /// Returns all members of the set stored at `key`.
    ///
    /// Returns an empty vector if the set does not exist; never an error.
    fn set_members(&self, ctx: &Context, key: &[u8]) -> StoreResult<Vec<Vec<u8>>>;

    /// Returns the cardinality of the set stored at `key`.
    ///
    /// A cheap probe; zero if the set does not exist.
    fn set_len(&self, ctx: &Context, key: &[u8]) -> StoreResult<usize>;

    /// Returns the keys of existing sets within `[low, high]`, inclusive,
    /// in ascending byte order.
    fn scan_sets(&self, ctx: &Context, low: &[u8], high: &[u8]) -> StoreResult<Vec<Vec<u8>>>;
}
