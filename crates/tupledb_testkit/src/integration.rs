//! Cross-crate integration test helpers.
//!
//! Provides a harness that mirrors every database mutation into a plain
//! map so tests can verify stored state against a model.

use std::collections::BTreeMap;
use tupledb_codec::{Tuple, Value};
use tupledb_core::{ScanArgs, TupleDatabase};

/// A test harness that tracks expected database contents.
pub struct IntegrationHarness {
    /// The database instance.
    pub db: TupleDatabase,
    /// Model of what the database should contain.
    model: BTreeMap<Tuple, Value>,
}

impl IntegrationHarness {
    /// Creates a new harness with an in-memory database.
    pub fn new() -> Self {
        Self {
            db: TupleDatabase::in_memory(),
            model: BTreeMap::new(),
        }
    }

    /// Creates a harness over an existing database.
    ///
    /// The model starts from whatever the database already holds.
    pub fn over(db: TupleDatabase) -> Self {
        let mut harness = Self {
            db,
            model: BTreeMap::new(),
        };
        for pair in harness
            .db
            .scan(&ScanArgs::all())
            .expect("Failed to scan database")
        {
            harness.model.insert(pair.key, pair.value);
        }
        harness
    }

    /// Sets a key through a transaction and records it in the model.
    pub fn set(&mut self, key: Tuple, value: impl Into<Value>) {
        let value = value.into();
        let mut tx = self.db.transact();
        tx.set(key.clone(), value.clone()).expect("Failed to set");
        tx.commit().expect("Failed to commit set");
        self.model.insert(key, value);
    }

    /// Removes a key through a transaction and records it in the model.
    pub fn remove(&mut self, key: Tuple) {
        let mut tx = self.db.transact();
        tx.remove(key.clone()).expect("Failed to remove");
        tx.commit().expect("Failed to commit remove");
        self.model.remove(&key);
    }

    /// Records a set in the model only, for writes applied out of band.
    pub fn model_set(&mut self, key: Tuple, value: impl Into<Value>) {
        self.model.insert(key, value.into());
    }

    /// Records a remove in the model only, for writes applied out of band.
    pub fn model_remove(&mut self, key: &Tuple) {
        self.model.remove(key);
    }

    /// Gets a key and checks it against the model.
    pub fn get_and_verify(&self, key: &Tuple) -> Option<Value> {
        let actual = self.db.get(key).expect("Failed to get key");
        assert_eq!(
            actual.as_ref(),
            self.model.get(key),
            "Value mismatch for {key:?}"
        );
        actual
    }

    /// Verifies the whole database matches the model, including row order.
    pub fn verify_all(&self) {
        let rows = self
            .db
            .scan(&ScanArgs::all())
            .expect("Failed to scan database");
        let actual: Vec<(&Tuple, &Value)> = rows.iter().map(|p| (&p.key, &p.value)).collect();
        let expected: Vec<(&Tuple, &Value)> = self.model.iter().collect();
        assert_eq!(actual, expected, "Database diverged from model");
    }

    /// Number of keys the model expects.
    pub fn tracked_count(&self) -> usize {
        self.model.len()
    }
}

impl Default for IntegrationHarness {
    fn default() -> Self {
        Self::new()
    }
}
