//! The database façade: reads, writes, transactions, and subscriptions over
//! a storage backend.

use crate::bounds::ScanArgs;
use crate::conflict::ConcurrencyLog;
use crate::error::{CoreError, CoreResult};
use crate::reactive::{ListenerCallback, ReactivityTracker};
use crate::transaction::Transaction;
use crate::types::TxId;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, instrument};
use tupledb_codec::{Tuple, Value};
use tupledb_storage::{InMemoryBackend, KeyValuePair, ScanQuery, StorageBackend, WriteOps};

pub(crate) struct Inner {
    backend: Mutex<Box<dyn StorageBackend>>,
    log: Mutex<ConcurrencyLog>,
    listeners: Mutex<ReactivityTracker>,
    /// Serializes the check-then-apply window of every commit.
    commit_lock: Mutex<()>,
    closed: AtomicBool,
}

/// An embedded database of tuple-keyed rows.
///
/// Cloning is cheap and every clone shares the same state, so a database
/// can be handed to as many threads as needed. All reads and writes go
/// through ranges of [`Tuple`] keys; writes are atomic write-sets, either
/// direct ([`commit`](Self::commit)) or staged through a
/// [`Transaction`].
///
/// # Example
///
/// ```rust
/// use tupledb_codec::tuple;
/// use tupledb_core::{ScanArgs, TupleDatabase};
/// use tupledb_storage::{KeyValuePair, WriteOps};
///
/// let db = TupleDatabase::in_memory();
/// db.commit(WriteOps {
///     set: vec![KeyValuePair::new(tuple!["users", "chet"], 1.0)],
///     remove: vec![],
/// })
/// .unwrap();
/// let rows = db.scan(&ScanArgs::prefix(tuple!["users"])).unwrap();
/// assert_eq!(rows.len(), 1);
/// ```
#[derive(Clone)]
pub struct TupleDatabase {
    inner: Arc<Inner>,
}

impl TupleDatabase {
    /// Opens a database over the given backend.
    #[must_use]
    pub fn new(backend: Box<dyn StorageBackend>) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend: Mutex::new(backend),
                log: Mutex::new(ConcurrencyLog::default()),
                listeners: Mutex::new(ReactivityTracker::default()),
                commit_lock: Mutex::new(()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Opens an ephemeral database backed by memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Box::new(InMemoryBackend::new()))
    }

    fn ensure_open(&self) -> CoreResult<()> {
        if self.inner.closed.load(Ordering::SeqCst) {
            Err(CoreError::DatabaseClosed)
        } else {
            Ok(())
        }
    }

    /// Scans a range of rows.
    ///
    /// # Errors
    ///
    /// Fails on invalid bounds, a closed database, or a backend error.
    pub fn scan(&self, args: &ScanArgs) -> CoreResult<Vec<KeyValuePair>> {
        self.scan_raw(&args.normalize(), None)
    }

    /// Looks up the value stored under exactly `key`.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::DuplicateKey`] if more than one row matches,
    /// which indicates a corrupted dataset.
    pub fn get(&self, key: &Tuple) -> CoreResult<Option<Value>> {
        lookup(self.scan_raw(&ScanQuery::exact(key), None)?, key)
    }

    /// Checks whether a row is stored under exactly `key`.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`get`](Self::get).
    pub fn exists(&self, key: &Tuple) -> CoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Scans the backend, optionally recording the read for conflict
    /// detection on behalf of a transaction.
    pub(crate) fn scan_raw(
        &self,
        query: &ScanQuery,
        txid: Option<&TxId>,
    ) -> CoreResult<Vec<KeyValuePair>> {
        self.ensure_open()?;
        if let Some(txid) = txid {
            self.inner.log.lock().read(txid, query.bounds.clone());
        }
        Ok(self.inner.backend.lock().scan(query)?)
    }

    /// Applies a write-set atomically and notifies affected listeners.
    ///
    /// # Errors
    ///
    /// Fails if any written tuple contains a `Min`/`Max` sentinel, or on a
    /// backend error.
    pub fn commit(&self, writes: WriteOps) -> CoreResult<()> {
        self.commit_with(None, writes)
    }

    /// Commits a write-set, checking `txid` for conflicts first when given.
    ///
    /// The pipeline runs under the commit lock: conflict check, concurrency
    /// log update, backend apply. Listener callbacks run after every lock is
    /// released, so a callback may freely read or write the database.
    #[instrument(skip_all, fields(txid = txid.map(TxId::as_str)))]
    pub(crate) fn commit_with(&self, txid: Option<&TxId>, writes: WriteOps) -> CoreResult<()> {
        self.ensure_open()?;
        for tuple in writes.touched_tuples() {
            if tuple.iter().any(Value::has_sentinel) {
                return Err(CoreError::SentinelInWrite {
                    tuple: tuple.clone(),
                });
            }
        }

        let emits = {
            let _guard = self.inner.commit_lock.lock();
            // Emits come from the pre-commit listener registry, so this
            // commit cannot affect its own notification set.
            let emits = self.inner.listeners.lock().compute_emits(&writes);
            {
                let mut log = self.inner.log.lock();
                if let Some(txid) = txid {
                    log.commit(txid)?;
                }
                for tuple in writes.touched_tuples() {
                    log.write(txid, tuple);
                }
            }
            self.inner.backend.lock().commit(&writes)?;
            debug!(
                sets = writes.set.len(),
                removes = writes.remove.len(),
                "write-set committed"
            );
            emits
        };

        ReactivityTracker::fire(emits);
        Ok(())
    }

    /// Registers a callback over a tuple range.
    ///
    /// The callback fires after every commit that touches the range, with
    /// the touching subset of the write-set. The subscription stays active
    /// until the returned handle is dropped or
    /// [`unsubscribe`](Subscription::unsubscribe)d.
    ///
    /// # Errors
    ///
    /// Fails if the database is closed.
    pub fn subscribe(&self, args: &ScanArgs, callback: ListenerCallback) -> CoreResult<Subscription> {
        self.ensure_open()?;
        let bounds = args.normalize().bounds;
        let key = self.inner.listeners.lock().subscribe(bounds, callback);
        Ok(Subscription {
            key,
            inner: Arc::downgrade(&self.inner),
        })
    }

    /// Starts a transaction with a fresh id.
    #[must_use]
    pub fn transact(&self) -> Transaction {
        self.transact_with_id(TxId::new())
    }

    /// Starts a transaction under a caller-chosen id.
    #[must_use]
    pub fn transact_with_id(&self, id: TxId) -> Transaction {
        Transaction::new(self.clone(), id)
    }

    /// Runs a transaction body, retrying on commit conflicts.
    ///
    /// The body stages its reads and writes on the transaction it is given;
    /// this method commits afterwards. Only conflicts are retried, up to
    /// `attempts` total tries; every other error is returned immediately.
    ///
    /// # Errors
    ///
    /// Returns the body's error, or the final [`CoreError::Conflict`] once
    /// the attempts are exhausted.
    pub fn transact_with_retry<T>(
        &self,
        attempts: usize,
        body: impl Fn(&mut Transaction) -> CoreResult<T>,
    ) -> CoreResult<T> {
        let mut tries = 0;
        loop {
            tries += 1;
            let mut tx = self.transact();
            let result = body(&mut tx).and_then(|value| tx.commit().map(|()| value));
            match result {
                Err(err) if err.is_conflict() && tries < attempts => {
                    debug!(tries, "commit conflict, retrying transaction");
                }
                other => return other,
            }
        }
    }

    /// Returns a view of the database under a key prefix.
    #[must_use]
    pub fn subspace(&self, prefix: Tuple) -> crate::subspace::Subspace {
        crate::subspace::Subspace::new(self.clone(), prefix)
    }

    /// Drops a transaction's entries from the concurrency log.
    pub(crate) fn cancel_tx(&self, txid: &TxId) {
        self.inner.log.lock().cancel(txid);
    }

    #[cfg(test)]
    pub(crate) fn log_len(&self) -> usize {
        self.inner.log.lock().len()
    }

    /// Closes the database and releases the backend.
    ///
    /// Every subsequent operation fails with [`CoreError::DatabaseClosed`].
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot release its medium.
    pub fn close(&self) -> CoreResult<()> {
        self.ensure_open()?;
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.backend.lock().close()?;
        Ok(())
    }
}

/// Resolves an exact-key scan to at most one value.
pub(crate) fn lookup(rows: Vec<KeyValuePair>, key: &Tuple) -> CoreResult<Option<Value>> {
    match rows.len() {
        0 => Ok(None),
        1 => Ok(rows.into_iter().next().map(|pair| pair.value)),
        count => Err(CoreError::DuplicateKey {
            key: key.clone(),
            count,
        }),
    }
}

/// Handle to an active subscription.
///
/// Dropping the handle removes the listener.
#[must_use = "dropping a subscription removes its listener"]
pub struct Subscription {
    key: Tuple,
    inner: Weak<Inner>,
}

impl Subscription {
    /// Removes the listener now instead of at drop.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.listeners.lock().unsubscribe(&self.key);
        }
    }
}
