//! Prefix-scoped views of a database.
//!
//! A subspace prepends its prefix to every key on the way in and strips it
//! on the way out, so code operating on a subspace never sees where in the
//! keyspace it actually lives.

use crate::bounds::ScanArgs;
use crate::database::{Subscription, TupleDatabase};
use crate::error::{CoreError, CoreResult};
use crate::reactive::ListenerCallback;
use crate::transaction::Transaction;
use std::sync::Arc;
use tracing::warn;
use tupledb_codec::{Tuple, Value};
use tupledb_storage::{KeyValuePair, WriteOps};

/// A view of a [`TupleDatabase`] under a key prefix.
///
/// All keys given to a subspace are relative to its prefix, and all keys it
/// returns have the prefix stripped. Subspaces nest.
///
/// # Example
///
/// ```rust
/// use tupledb_codec::tuple;
/// use tupledb_core::{ScanArgs, TupleDatabase};
///
/// let db = TupleDatabase::in_memory();
/// let users = db.subspace(tuple!["users"]);
/// let mut tx = users.transact();
/// tx.set(tuple!["chet"], 1.0).unwrap();
/// tx.commit().unwrap();
///
/// let rows = users.scan(&ScanArgs::all()).unwrap();
/// assert_eq!(rows[0].key, tuple!["chet"]);
/// assert!(db.exists(&tuple!["users", "chet"]).unwrap());
/// ```
#[derive(Clone)]
pub struct Subspace {
    db: TupleDatabase,
    prefix: Tuple,
}

impl Subspace {
    pub(crate) fn new(db: TupleDatabase, prefix: Tuple) -> Self {
        Self { db, prefix }
    }

    /// This subspace's prefix within the full keyspace.
    #[must_use]
    pub fn prefix(&self) -> &Tuple {
        &self.prefix
    }

    /// A nested subspace under `prefix` relative to this one.
    #[must_use]
    pub fn subspace(&self, prefix: Tuple) -> Subspace {
        Subspace::new(self.db.clone(), self.prepend(&prefix))
    }

    fn prepend(&self, key: &[Value]) -> Tuple {
        let mut full = Vec::with_capacity(self.prefix.len() + key.len());
        full.extend_from_slice(&self.prefix);
        full.extend_from_slice(key);
        full
    }

    fn strip(&self, tuple: &Tuple) -> CoreResult<Tuple> {
        if tuple.len() >= self.prefix.len() && tuple[..self.prefix.len()] == self.prefix[..] {
            Ok(tuple[self.prefix.len()..].to_vec())
        } else {
            Err(CoreError::PrefixMismatch {
                prefix: self.prefix.clone(),
                tuple: tuple.clone(),
            })
        }
    }

    fn widen(&self, args: &ScanArgs) -> ScanArgs {
        let mut widened = args.clone();
        widened.prefix = Some(match &args.prefix {
            Some(inner) => self.prepend(inner),
            None => self.prefix.clone(),
        });
        widened
    }

    fn strip_rows(&self, rows: Vec<KeyValuePair>) -> CoreResult<Vec<KeyValuePair>> {
        rows.into_iter()
            .map(|pair| {
                Ok(KeyValuePair {
                    key: self.strip(&pair.key)?,
                    value: pair.value,
                })
            })
            .collect()
    }

    /// Scans a range relative to the prefix.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`TupleDatabase::scan`].
    pub fn scan(&self, args: &ScanArgs) -> CoreResult<Vec<KeyValuePair>> {
        let rows = self.db.scan(&self.widen(args))?;
        self.strip_rows(rows)
    }

    /// Looks up a value under a prefix-relative key.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`TupleDatabase::get`].
    pub fn get(&self, key: &Tuple) -> CoreResult<Option<Value>> {
        self.db.get(&self.prepend(key))
    }

    /// Checks for a row under a prefix-relative key.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`TupleDatabase::exists`].
    pub fn exists(&self, key: &Tuple) -> CoreResult<bool> {
        self.db.exists(&self.prepend(key))
    }

    /// Applies a write-set of prefix-relative keys atomically.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`TupleDatabase::commit`].
    pub fn commit(&self, writes: WriteOps) -> CoreResult<()> {
        self.db.commit(self.widen_writes(writes))
    }

    fn widen_writes(&self, writes: WriteOps) -> WriteOps {
        WriteOps {
            set: writes
                .set
                .into_iter()
                .map(|pair| KeyValuePair {
                    key: self.prepend(&pair.key),
                    value: pair.value,
                })
                .collect(),
            remove: writes
                .remove
                .into_iter()
                .map(|key| self.prepend(&key))
                .collect(),
        }
    }

    /// Subscribes to a range relative to the prefix.
    ///
    /// The callback receives write-sets with the prefix already stripped.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`TupleDatabase::subscribe`].
    pub fn subscribe(
        &self,
        args: &ScanArgs,
        callback: ListenerCallback,
    ) -> CoreResult<Subscription> {
        let view = self.clone();
        let relative: ListenerCallback = Arc::new(move |writes: &WriteOps| {
            match view.strip_writes(writes) {
                Ok(stripped) => callback(&stripped),
                Err(_) => {
                    // Can only happen if the listener index hands us a
                    // tuple outside our own widened bounds.
                    warn!("subscription write-set fell outside the subspace prefix; dropped");
                }
            }
        });
        self.db.subscribe(&self.widen(args), relative)
    }

    fn strip_writes(&self, writes: &WriteOps) -> CoreResult<WriteOps> {
        Ok(WriteOps {
            set: self.strip_rows(writes.set.clone())?,
            remove: writes
                .remove
                .iter()
                .map(|key| self.strip(key))
                .collect::<CoreResult<_>>()?,
        })
    }

    /// Starts a transaction scoped to this prefix.
    #[must_use]
    pub fn transact(&self) -> SubspaceTransaction {
        SubspaceTransaction {
            tx: self.db.transact(),
            subspace: self.clone(),
        }
    }
}

/// A transaction whose keys are relative to a [`Subspace`] prefix.
///
/// Mirrors [`Transaction`]; conflict detection still runs over the full
/// keyspace, so subspace and whole-database transactions interoperate.
pub struct SubspaceTransaction {
    tx: Transaction,
    subspace: Subspace,
}

impl SubspaceTransaction {
    /// Stages a set under a prefix-relative key.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Transaction::set`].
    pub fn set(&mut self, key: Tuple, value: impl Into<Value>) -> CoreResult<()> {
        self.tx.set(self.subspace.prepend(&key), value)
    }

    /// Stages a remove under a prefix-relative key.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Transaction::remove`].
    pub fn remove(&mut self, key: Tuple) -> CoreResult<()> {
        self.tx.remove(self.subspace.prepend(&key))
    }

    /// Scans a prefix-relative range, seeing staged writes.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Transaction::scan`].
    pub fn scan(&self, args: &ScanArgs) -> CoreResult<Vec<KeyValuePair>> {
        let rows = self.tx.scan(&self.subspace.widen(args))?;
        self.subspace.strip_rows(rows)
    }

    /// Looks up a prefix-relative key, seeing staged writes.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Transaction::get`].
    pub fn get(&self, key: &Tuple) -> CoreResult<Option<Value>> {
        self.tx.get(&self.subspace.prepend(key))
    }

    /// Checks a prefix-relative key, seeing staged writes.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Transaction::exists`].
    pub fn exists(&self, key: &Tuple) -> CoreResult<bool> {
        self.tx.exists(&self.subspace.prepend(key))
    }

    /// Commits the staged writes.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Transaction::commit`].
    pub fn commit(&mut self) -> CoreResult<()> {
        self.tx.commit()
    }

    /// Cancels the transaction.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Transaction::cancel`].
    pub fn cancel(&mut self) -> CoreResult<()> {
        self.tx.cancel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tupledb_codec::tuple;

    fn set(key: Tuple, value: impl Into<Value>) -> WriteOps {
        WriteOps {
            set: vec![KeyValuePair::new(key, value)],
            remove: vec![],
        }
    }

    #[test]
    fn writes_land_under_the_prefix() {
        let db = TupleDatabase::in_memory();
        let users = db.subspace(tuple!["users"]);

        users.commit(set(tuple!["chet"], 1.0)).unwrap();

        assert!(db.exists(&tuple!["users", "chet"]).unwrap());
        assert_eq!(users.get(&tuple!["chet"]).unwrap(), Some(Value::Number(1.0)));
    }

    #[test]
    fn scans_strip_the_prefix_and_ignore_outside_rows() {
        let db = TupleDatabase::in_memory();
        db.commit(set(tuple!["users", "a"], 1.0)).unwrap();
        db.commit(set(tuple!["posts", "1"], 2.0)).unwrap();

        let users = db.subspace(tuple!["users"]);
        let rows = users.scan(&ScanArgs::all()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, tuple!["a"]);
    }

    #[test]
    fn nested_subspaces_compose() {
        let db = TupleDatabase::in_memory();
        let inner = db.subspace(tuple!["a"]).subspace(tuple!["b"]);
        assert_eq!(inner.prefix(), &tuple!["a", "b"]);

        inner.commit(set(tuple!["c"], 1.0)).unwrap();
        assert!(db.exists(&tuple!["a", "b", "c"]).unwrap());
    }

    #[test]
    fn transaction_keys_are_relative() {
        let db = TupleDatabase::in_memory();
        let users = db.subspace(tuple!["users"]);

        let mut tx = users.transact();
        tx.set(tuple!["a"], 1.0).unwrap();
        assert!(tx.exists(&tuple!["a"]).unwrap());
        assert_eq!(tx.scan(&ScanArgs::all()).unwrap()[0].key, tuple!["a"]);
        tx.commit().unwrap();

        assert!(db.exists(&tuple!["users", "a"]).unwrap());
    }

    #[test]
    fn subspace_and_database_transactions_conflict() {
        let db = TupleDatabase::in_memory();
        db.commit(set(tuple!["users", "a"], 1.0)).unwrap();
        let users = db.subspace(tuple!["users"]);

        let mut inside = users.transact();
        let _ = inside.scan(&ScanArgs::all()).unwrap();
        inside.set(tuple!["b"], 2.0).unwrap();

        // A direct commit lands inside the range the subspace tx read.
        db.commit(set(tuple!["users", "c"], 3.0)).unwrap();

        let err = inside.commit().unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn subscription_delivers_stripped_keys() {
        let db = TupleDatabase::in_memory();
        let users = db.subspace(tuple!["users"]);

        let seen: Arc<Mutex<Vec<WriteOps>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let _sub = users
            .subscribe(
                &ScanArgs::all(),
                Arc::new(move |writes: &WriteOps| {
                    sink.lock().push(writes.clone());
                }),
            )
            .unwrap();

        db.commit(set(tuple!["users", "chet"], 1.0)).unwrap();
        db.commit(set(tuple!["posts", "1"], 2.0)).unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].set[0].key, tuple!["chet"]);
    }

    #[test]
    fn strip_rejects_foreign_tuples() {
        let db = TupleDatabase::in_memory();
        let users = db.subspace(tuple!["users"]);
        let err = users.strip(&tuple!["posts", "1"]).unwrap_err();
        assert!(matches!(err, CoreError::PrefixMismatch { .. }));
    }
}
