//! # omkv Core
//!
//! Object-mapping layer over a key-value store.
//!
//! This crate provides:
//! - Schema registration with per-type field descriptors
//! - Deterministic entity/record conversion validated against the schema
//! - Secondary-index maintenance over store-level sets
//! - A typed repository with optimistic-concurrency CRUD
//! - A conjunctive query engine with index intersection
//!
//! Applications interact through [`Repository`]; the other modules back
//! it and are exposed for advanced use and testing.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
mod entity;
mod error;
mod index;
mod keys;
mod query;
mod repository;
mod schema;

pub use entity::Entity;
pub use error::{CoreError, CoreResult, ErrorKind, SchemaError};
pub use index::IndexMaintainer;
pub use query::Predicate;
pub use repository::Repository;
pub use schema::{FieldDef, Schema, SchemaRegistry, TypeDescriptor};

pub use omkv_codec::{FieldKind, FieldValue, Record};
pub use omkv_store::{CancelToken, Context, InMemoryStore, KvStore, Precondition, Version};
