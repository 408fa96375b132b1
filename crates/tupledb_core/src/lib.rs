//! # TupleDB Core
//!
//! The database engine: transactions, optimistic concurrency control, and
//! range subscriptions layered over a pluggable storage backend.
//!
//! A [`TupleDatabase`] stores rows keyed by [`Tuple`]s of [`Value`]s,
//! ordered the same way the `tupledb_codec` binary encoding orders them.
//! Reads are range scans over those keys; writes are atomic write-sets.
//!
//! - [`Transaction`] stages writes and detects read/write conflicts at
//!   commit (first committer wins; conflicts are retryable via
//!   [`TupleDatabase::transact_with_retry`])
//! - [`TupleDatabase::subscribe`] registers callbacks over key ranges,
//!   fired with exactly the committed operations inside the range
//! - [`Subspace`] scopes all of the above under a key prefix
//!
//! ## Example
//!
//! ```rust
//! use tupledb_codec::tuple;
//! use tupledb_core::{ScanArgs, TupleDatabase};
//!
//! let db = TupleDatabase::in_memory();
//!
//! let mut tx = db.transact();
//! tx.set(tuple!["users", "chet", "corcos"], 1.0).unwrap();
//! tx.set(tuple!["users", "meghan", "navarro"], 2.0).unwrap();
//! tx.commit().unwrap();
//!
//! let users = db.scan(&ScanArgs::prefix(tuple!["users"])).unwrap();
//! assert_eq!(users.len(), 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod bounds;
mod conflict;
mod database;
mod error;
mod reactive;
mod subspace;
mod transaction;
mod types;

pub use bounds::ScanArgs;
pub use database::{Subscription, TupleDatabase};
pub use error::{CoreError, CoreResult};
pub use reactive::ListenerCallback;
pub use subspace::{Subspace, SubspaceTransaction};
pub use transaction::Transaction;
pub use types::{TransactionState, TxId};

pub use tupledb_codec::{tuple, Tuple, Value};
pub use tupledb_storage::{
    Bounds, FileBackend, InMemoryBackend, KeyValuePair, ScanQuery, StorageBackend, WriteOps,
};
