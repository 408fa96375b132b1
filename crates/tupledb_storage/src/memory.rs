//! In-memory storage backend.

use crate::backend::{apply_writes, StorageBackend};
use crate::error::{StorageError, StorageResult};
use crate::sorted;
use crate::types::{KeyValuePair, ScanQuery, WriteOps};
use parking_lot::RwLock;

/// An in-memory storage backend holding rows in a sorted vector.
///
/// Suitable for unit tests, integration tests, and ephemeral databases that
/// don't need persistence.
///
/// # Example
///
/// ```rust
/// use tupledb_codec::tuple;
/// use tupledb_storage::{InMemoryBackend, KeyValuePair, ScanQuery, StorageBackend, WriteOps};
///
/// let mut backend = InMemoryBackend::new();
/// backend
///     .commit(&WriteOps {
///         set: vec![KeyValuePair::new(tuple!["chet"], 1.0)],
///         remove: vec![],
///     })
///     .unwrap();
/// assert_eq!(backend.scan(&ScanQuery::all()).unwrap().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    rows: RwLock<Vec<KeyValuePair>>,
    closed: bool,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend pre-populated with rows.
    ///
    /// Rows may arrive in any order; they are sorted on construction.
    #[must_use]
    pub fn with_rows(rows: Vec<KeyValuePair>) -> Self {
        let mut sorted_rows = Vec::with_capacity(rows.len());
        for row in rows {
            sorted::upsert(&mut sorted_rows, row);
        }
        Self {
            rows: RwLock::new(sorted_rows),
            closed: false,
        }
    }

    /// Returns the number of stored rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Checks whether the backend holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    fn ensure_open(&self) -> StorageResult<()> {
        if self.closed {
            Err(StorageError::Closed)
        } else {
            Ok(())
        }
    }
}

impl StorageBackend for InMemoryBackend {
    fn scan(&self, query: &ScanQuery) -> StorageResult<Vec<KeyValuePair>> {
        self.ensure_open()?;
        let rows = self.rows.read();
        Ok(sorted::scan(&rows, query)?.into_iter().cloned().collect())
    }

    fn commit(&mut self, writes: &WriteOps) -> StorageResult<()> {
        self.ensure_open()?;
        apply_writes(&mut self.rows.write(), writes);
        Ok(())
    }

    fn close(&mut self) -> StorageResult<()> {
        self.closed = true;
        Ok(())
    }
}
