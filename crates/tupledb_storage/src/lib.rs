//! # TupleDB Storage
//!
//! Storage backend trait and implementations for TupleDB.
//!
//! This crate provides the lowest-level storage abstraction: a
//! [`StorageBackend`] can scan a tuple range and atomically apply a
//! [`WriteOps`] write-set, nothing more. Transactions, conflict detection,
//! and subscriptions all live above it in `tupledb_core`.
//!
//! It also hosts the shared data model ([`KeyValuePair`], [`Bounds`],
//! [`ScanQuery`]) and the binary-search [`sorted`] primitives every sorted
//! collection in the system is built on.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - sorted vector, for tests and ephemeral data
//! - [`FileBackend`] - newline-delimited JSON file, persisted atomically

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;
pub mod sorted;
mod types;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
pub use types::{Bounds, KeyValuePair, ScanQuery, WriteOps};
