//! Test fixtures and database helpers.
//!
//! Provides convenience functions for setting up test databases
//! and common test datasets.

use std::path::PathBuf;
use tempfile::TempDir;
use tupledb_codec::{tuple, Tuple};
use tupledb_core::TupleDatabase;
use tupledb_storage::{FileBackend, KeyValuePair, WriteOps};

/// A test database with automatic cleanup.
pub struct TestDatabase {
    /// The database instance.
    pub db: TupleDatabase,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: Option<TempDir>,
}

impl TestDatabase {
    /// Creates a new in-memory test database.
    pub fn memory() -> Self {
        Self {
            db: TupleDatabase::in_memory(),
            temp_dir: None,
        }
    }

    /// Creates a new file-based test database.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("test.tupledb");
        let backend = FileBackend::open(&path).expect("Failed to open file backend");
        Self {
            db: TupleDatabase::new(Box::new(backend)),
            temp_dir: Some(temp_dir),
        }
    }

    /// Returns the database file path if file-based, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self.temp_dir
            .as_ref()
            .map(|dir| dir.path().join("test.tupledb"))
    }
}

impl std::ops::Deref for TestDatabase {
    type Target = TupleDatabase;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

/// Runs a test with a temporary in-memory database.
pub fn with_temp_db<F, R>(f: F) -> R
where
    F: FnOnce(&TupleDatabase) -> R,
{
    let test_db = TestDatabase::memory();
    f(&test_db.db)
}

/// Runs a test with a temporary file-based database.
///
/// The closure also receives the backing file path so a test can reopen it.
pub fn with_file_db<F, R>(f: F) -> R
where
    F: FnOnce(&TupleDatabase, &std::path::Path) -> R,
{
    let test_db = TestDatabase::file();
    let path = test_db.path().expect("file database always has a path");
    f(&test_db.db, &path)
}

/// A small dataset of people keyed by `["person", last, first]`.
pub fn people_rows() -> Vec<KeyValuePair> {
    vec![
        KeyValuePair::new(tuple!["person", "corcos", "chet"], 1.0),
        KeyValuePair::new(tuple!["person", "corcos", "sam"], 2.0),
        KeyValuePair::new(tuple!["person", "last", "simon"], 3.0),
        KeyValuePair::new(tuple!["person", "navarro", "meghan"], 4.0),
        KeyValuePair::new(tuple!["person", "smith", "jon"], 5.0),
    ]
}

/// Commits [`people_rows`] into a database.
pub fn seed_people(db: &TupleDatabase) {
    db.commit(WriteOps {
        set: people_rows(),
        remove: vec![],
    })
    .expect("Failed to seed people rows");
}

/// The keys of [`people_rows`], in stored order.
pub fn people_keys() -> Vec<Tuple> {
    people_rows().into_iter().map(|pair| pair.key).collect()
}
