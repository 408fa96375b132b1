//! Staged read/write transactions with optimistic conflict detection.

use crate::bounds::ScanArgs;
use crate::database::{lookup, TupleDatabase};
use crate::error::{CoreError, CoreResult};
use crate::types::{TransactionState, TxId};
use tupledb_codec::{Tuple, Value};
use tupledb_storage::sorted;
use tupledb_storage::{KeyValuePair, ScanQuery, WriteOps};

/// A transaction over a [`TupleDatabase`].
///
/// Writes are staged locally and become visible to others only at
/// [`commit`](Self::commit); reads see the staged writes layered over the
/// backend ("read your writes") and are tracked for conflict detection. A
/// commit fails with [`CoreError::Conflict`] if any other commit wrote
/// inside a range this transaction read.
///
/// Dropping an active transaction cancels it.
pub struct Transaction {
    db: TupleDatabase,
    id: TxId,
    state: TransactionState,
    sets: Vec<KeyValuePair>,
    removes: Vec<Tuple>,
}

impl Transaction {
    pub(crate) fn new(db: TupleDatabase, id: TxId) -> Self {
        Self {
            db,
            id,
            state: TransactionState::Active,
            sets: Vec::new(),
            removes: Vec::new(),
        }
    }

    /// This transaction's id.
    #[must_use]
    pub fn id(&self) -> &TxId {
        &self.id
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    fn ensure_active(&self) -> CoreResult<()> {
        if self.state == TransactionState::Active {
            Ok(())
        } else {
            Err(CoreError::TransactionClosed {
                txid: self.id.clone(),
                state: self.state,
            })
        }
    }

    /// Stages a set; any staged remove of the same key is dropped.
    ///
    /// # Errors
    ///
    /// Fails if the transaction is no longer active.
    pub fn set(&mut self, key: Tuple, value: impl Into<Value>) -> CoreResult<()> {
        self.ensure_active()?;
        sorted::remove(&mut self.removes, &key);
        sorted::upsert(&mut self.sets, KeyValuePair::new(key, value));
        Ok(())
    }

    /// Stages a remove; any staged set of the same key is dropped.
    ///
    /// # Errors
    ///
    /// Fails if the transaction is no longer active.
    pub fn remove(&mut self, key: Tuple) -> CoreResult<()> {
        self.ensure_active()?;
        sorted::remove(&mut self.sets, &key);
        sorted::upsert(&mut self.removes, key);
        Ok(())
    }

    /// Stages a whole write-set at once.
    ///
    /// # Errors
    ///
    /// Fails if the transaction is no longer active.
    pub fn write(&mut self, writes: WriteOps) -> CoreResult<()> {
        for key in writes.remove {
            self.remove(key)?;
        }
        for pair in writes.set {
            self.set(pair.key, pair.value)?;
        }
        Ok(())
    }

    /// Scans a range, seeing staged writes layered over stored rows.
    ///
    /// The read range is recorded for conflict detection.
    ///
    /// # Errors
    ///
    /// Fails on invalid bounds, an inactive transaction, or a backend error.
    pub fn scan(&self, args: &ScanArgs) -> CoreResult<Vec<KeyValuePair>> {
        self.ensure_active()?;
        let query = args.normalize();

        // Fetch the full range; limit and direction apply after the staged
        // writes are layered in.
        let backend_query = ScanQuery {
            bounds: query.bounds.clone(),
            limit: None,
            reverse: false,
        };
        let mut rows = self.db.scan_raw(&backend_query, Some(&self.id))?;

        for pair in &self.sets {
            if query.bounds.contains(&pair.key) {
                sorted::upsert(&mut rows, pair.clone());
            }
        }
        for key in &self.removes {
            if query.bounds.contains(key) {
                sorted::remove(&mut rows, key);
            }
        }

        if query.reverse {
            rows.reverse();
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    /// Looks up the value under exactly `key`, seeing staged writes.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::DuplicateKey`] if more than one stored row
    /// matches.
    pub fn get(&self, key: &Tuple) -> CoreResult<Option<Value>> {
        self.ensure_active()?;
        let rows = self.scan(&ScanArgs {
            gte: Some(key.clone()),
            lte: Some(key.clone()),
            ..ScanArgs::default()
        })?;
        lookup(rows, key)
    }

    /// Checks whether a row exists under exactly `key`, seeing staged
    /// writes.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`get`](Self::get).
    pub fn exists(&self, key: &Tuple) -> CoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Commits the staged writes.
    ///
    /// On success the transaction is committed and its writes are visible;
    /// on any failure (conflict included) it is canceled and its staged
    /// writes are discarded.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::Conflict`] if another commit wrote inside a
    /// range this transaction read.
    pub fn commit(&mut self) -> CoreResult<()> {
        self.ensure_active()?;
        let writes = WriteOps {
            set: std::mem::take(&mut self.sets),
            remove: std::mem::take(&mut self.removes),
        };
        match self.db.commit_with(Some(&self.id), writes) {
            Ok(()) => {
                self.state = TransactionState::Committed;
                Ok(())
            }
            Err(err) => {
                // The commit may have failed before the log retired this
                // transaction's entries; purging is idempotent, so always
                // release them.
                self.db.cancel_tx(&self.id);
                self.state = TransactionState::Canceled;
                Err(err)
            }
        }
    }

    /// Cancels the transaction, discarding staged writes.
    ///
    /// # Errors
    ///
    /// Fails if the transaction already reached a terminal state.
    pub fn cancel(&mut self) -> CoreResult<()> {
        self.ensure_active()?;
        self.state = TransactionState::Canceled;
        self.sets.clear();
        self.removes.clear();
        self.db.cancel_tx(&self.id);
        Ok(())
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.state == TransactionState::Active {
            let _ = self.cancel();
        }
    }
}
