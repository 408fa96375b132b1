//! Storage backend trait definition.

use crate::error::StorageResult;
use crate::types::{KeyValuePair, ScanQuery, WriteOps};

/// A low-level storage backend for TupleDB.
///
/// A backend is simply "something that can scan a tuple range and apply a
/// write-set atomically". It holds rows sorted by tuple key and knows
/// nothing about transactions, conflict detection, or subscriptions - the
/// database layer owns all of that.
///
/// # Invariants
///
/// - `scan` returns rows sorted ascending by tuple key (descending when the
///   query is reversed), all inside the query's bounds
/// - `commit` applies the whole write-set or none of it; when a tuple
///   appears in both `set` and `remove`, `set` wins
/// - after `close`, every operation fails with [`StorageError::Closed`]
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - sorted vector, for tests and ephemeral data
/// - [`super::FileBackend`] - newline-delimited JSON file
///
/// [`StorageError::Closed`]: crate::StorageError::Closed
pub trait StorageBackend: Send + Sync {
    /// Returns the rows inside the query's bounds.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid bounds or an unreadable medium.
    fn scan(&self, query: &ScanQuery) -> StorageResult<Vec<KeyValuePair>>;

    /// Applies a write-set atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be written.
    fn commit(&mut self, writes: &WriteOps) -> StorageResult<()>;

    /// Releases the backend; further operations fail.
    ///
    /// # Errors
    ///
    /// Returns an error if releasing the medium fails.
    fn close(&mut self) -> StorageResult<()>;
}

/// Applies a write-set to a sorted row vector, deduping overlap in favor of
/// `set`.
pub(crate) fn apply_writes(items: &mut Vec<KeyValuePair>, writes: &WriteOps) {
    for key in &writes.remove {
        // A write-set is not required to arrive sorted, so check linearly.
        if !writes.set.iter().any(|pair| &pair.key == key) {
            crate::sorted::remove(items, key);
        }
    }
    for pair in &writes.set {
        crate::sorted::upsert(items, pair.clone());
    }
}
