//! Error types for TupleDB core.

use crate::types::{TransactionState, TxId};
use thiserror::Error;
use tupledb_codec::Tuple;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in TupleDB core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] tupledb_storage::StorageError),

    /// Tuple codec error.
    #[error("codec error: {0}")]
    Codec(#[from] tupledb_codec::CodecError),

    /// A committed write landed inside a range this transaction read.
    ///
    /// This is the only retryable error: re-run the transaction body with
    /// fresh reads (see [`crate::TupleDatabase::transact_with_retry`]).
    #[error("write conflict: {txid} read a range containing written tuple {tuple:?}")]
    Conflict {
        /// The transaction whose commit failed.
        txid: TxId,
        /// The written tuple that fell inside one of its read ranges.
        tuple: Tuple,
    },

    /// An equality read matched more than one stored tuple.
    #[error("duplicate key: {count} stored entries match {key:?}")]
    DuplicateKey {
        /// The key that was looked up.
        key: Tuple,
        /// How many entries matched.
        count: usize,
    },

    /// An operation was attempted on a transaction in a terminal state.
    #[error("transaction {txid} is already {state}")]
    TransactionClosed {
        /// The transaction id.
        txid: TxId,
        /// The terminal state it is in.
        state: TransactionState,
    },

    /// A tuple handed back from a subspace does not carry its prefix.
    #[error("tuple {tuple:?} does not start with prefix {prefix:?}")]
    PrefixMismatch {
        /// The expected prefix.
        prefix: Tuple,
        /// The offending tuple.
        tuple: Tuple,
    },

    /// A write-set contained a `Min`/`Max` sentinel in a stored tuple.
    #[error("sentinel value in stored tuple {tuple:?}")]
    SentinelInWrite {
        /// The offending tuple.
        tuple: Tuple,
    },

    /// The database has been closed.
    #[error("database is closed")]
    DatabaseClosed,
}

impl CoreError {
    /// Checks whether this error is a commit conflict, the one failure a
    /// generic retry loop should catch.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, CoreError::Conflict { .. })
    }
}
