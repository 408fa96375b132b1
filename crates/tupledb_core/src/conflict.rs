//! Optimistic concurrency control via a shared read/write log.
//!
//! Every transactional read records its bounds; every committed write
//! records the tuple it touched. At commit time a transaction fails if any
//! logged write landed inside a range it read — writes tagged with the
//! committer's own id included, which is what makes resumed transaction
//! ids safe. Entries are purged as soon as no live read can still conflict
//! with them, so the log stays proportional to the set of in-flight
//! transactions.

use crate::error::{CoreError, CoreResult};
use crate::types::TxId;
use tracing::debug;
use tupledb_codec::Tuple;
use tupledb_storage::Bounds;

#[derive(Debug, Clone)]
enum LogEntry {
    /// A range read performed by a transaction.
    Read { txid: TxId, bounds: Bounds },
    /// A committed write. `txid` is `None` for non-transactional commits.
    Write { txid: Option<TxId>, tuple: Tuple },
}

/// Shared log of transactional reads and committed writes.
#[derive(Debug, Default)]
pub(crate) struct ConcurrencyLog {
    entries: Vec<LogEntry>,
}

impl ConcurrencyLog {
    /// Records a range read by `txid`.
    pub(crate) fn read(&mut self, txid: &TxId, bounds: Bounds) {
        self.entries.push(LogEntry::Read {
            txid: txid.clone(),
            bounds,
        });
    }

    /// Records a committed write.
    ///
    /// The write is only retained if it falls inside a range some live
    /// transaction has read; otherwise nothing can ever conflict with it.
    pub(crate) fn write(&mut self, txid: Option<&TxId>, tuple: &Tuple) {
        let watched = self.entries.iter().any(|entry| {
            matches!(entry, LogEntry::Read { bounds, .. } if bounds.contains(tuple))
        });
        if watched {
            self.entries.push(LogEntry::Write {
                txid: txid.cloned(),
                tuple: tuple.clone(),
            });
        }
    }

    /// Checks `txid` for conflicts and retires its entries.
    ///
    /// The check is read-versus-all-writes: a retained write conflicts no
    /// matter which transaction (the committer itself included) produced
    /// it. The transaction's reads are always purged, whether or not the
    /// check passes; a failed commit leaves the log as if the transaction
    /// had been canceled.
    pub(crate) fn commit(&mut self, txid: &TxId) -> CoreResult<()> {
        let read_bounds: Vec<Bounds> = self
            .entries
            .iter()
            .filter_map(|entry| match entry {
                LogEntry::Read { txid: reader, bounds } if reader == txid => {
                    Some(bounds.clone())
                }
                _ => None,
            })
            .collect();

        let conflict = self.entries.iter().find_map(|entry| match entry {
            LogEntry::Write { txid: writer, tuple }
                if read_bounds.iter().any(|bounds| bounds.contains(tuple)) =>
            {
                Some((writer.clone(), tuple.clone()))
            }
            _ => None,
        });

        self.purge(txid);

        match conflict {
            Some((writer, tuple)) => {
                debug!(
                    txid = txid.as_str(),
                    writer = writer.as_ref().map(TxId::as_str),
                    "commit conflict"
                );
                Err(CoreError::Conflict {
                    txid: txid.clone(),
                    tuple,
                })
            }
            None => Ok(()),
        }
    }

    /// Retires a transaction's entries without a conflict check.
    pub(crate) fn cancel(&mut self, txid: &TxId) {
        self.purge(txid);
    }

    /// Drops `txid`'s reads, then drops every write no remaining read
    /// watches.
    fn purge(&mut self, txid: &TxId) {
        self.entries.retain(|entry| match entry {
            LogEntry::Read { txid: reader, .. } => reader != txid,
            LogEntry::Write { .. } => true,
        });
        let kept: Vec<LogEntry> = self
            .entries
            .iter()
            .filter(|entry| match entry {
                LogEntry::Read { .. } => true,
                LogEntry::Write { tuple, .. } => self.entries.iter().any(|other| {
                    matches!(other, LogEntry::Read { bounds, .. } if bounds.contains(tuple))
                }),
            })
            .cloned()
            .collect();
        self.entries = kept;
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
