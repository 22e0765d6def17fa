//! # omkv Store
//!
//! Key-value store abstraction for omkv.
//!
//! This crate defines the contract the object-mapping core depends on:
//! versioned conditional writes, concurrency-safe set add/remove, and
//! ordered scans over set keys. The store's own transaction protocol,
//! transport, and topology stay behind this trait.
//!
//! ## Usage
//!
//! ```
//! use omkv_store::{Context, InMemoryStore, KvStore, Precondition};
//!
//! let store = InMemoryStore::new();
//! let ctx = Context::background();
//!
//! let v1 = store.put(&ctx, b"k", b"a", Precondition::Absent).unwrap();
//! // Optimistic concurrency: write only if the version is unchanged.
//! let v2 = store.put(&ctx, b"k", b"b", Precondition::Version(v1)).unwrap();
//! assert!(v2 > v1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod context;
mod error;
mod memory;

pub use backend::{KvStore, Precondition, Version};
pub use context::{CancelToken, Context};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
