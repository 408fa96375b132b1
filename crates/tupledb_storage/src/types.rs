//! Core data model shared by backends and the database layer.

use tupledb_codec::{Tuple, Value};

/// A stored tuple together with its value; the persisted unit.
///
/// Keys are unique within a dataset: setting an existing key replaces its
/// value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValuePair {
    /// The tuple key.
    pub key: Tuple,
    /// The stored value.
    pub value: Value,
}

impl KeyValuePair {
    /// Creates a key-value pair.
    pub fn new(key: Tuple, value: impl Into<Value>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

/// The atomic unit of mutation: tuples to set and tuples to remove.
///
/// A tuple must not appear in both lists; appliers resolve any overlap in
/// favor of `set` (last-write-wins).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOps {
    /// Pairs to insert or replace.
    pub set: Vec<KeyValuePair>,
    /// Keys to remove.
    pub remove: Vec<Tuple>,
}

impl WriteOps {
    /// Checks whether this write-set contains no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.remove.is_empty()
    }

    /// Iterates over every tuple this write-set touches.
    pub fn touched_tuples(&self) -> impl Iterator<Item = &Tuple> {
        self.set
            .iter()
            .map(|pair| &pair.key)
            .chain(self.remove.iter())
    }
}

/// Optional lower and upper edges of a tuple range.
///
/// All four edges are checked independently: `gt`/`lt` are strict,
/// `gte`/`lte` inclusive. Edge tuples may contain `Min`/`Max` sentinels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bounds {
    /// Exclusive lower bound.
    pub gt: Option<Tuple>,
    /// Inclusive lower bound.
    pub gte: Option<Tuple>,
    /// Exclusive upper bound.
    pub lt: Option<Tuple>,
    /// Inclusive upper bound.
    pub lte: Option<Tuple>,
}

impl Bounds {
    /// Checks whether a tuple falls inside these bounds.
    #[must_use]
    pub fn contains(&self, tuple: &Tuple) -> bool {
        if let Some(gt) = &self.gt {
            if tuple <= gt {
                return false;
            }
        }
        if let Some(gte) = &self.gte {
            if tuple < gte {
                return false;
            }
        }
        if let Some(lt) = &self.lt {
            if tuple >= lt {
                return false;
            }
        }
        if let Some(lte) = &self.lte {
            if tuple > lte {
                return false;
            }
        }
        true
    }

    /// Effective lower edge, if any.
    #[must_use]
    pub fn lower(&self) -> Option<&Tuple> {
        self.gt.as_ref().or(self.gte.as_ref())
    }

    /// Effective upper edge, if any.
    #[must_use]
    pub fn upper(&self) -> Option<&Tuple> {
        self.lt.as_ref().or(self.lte.as_ref())
    }
}

/// A canonical range query over full tuples: bounds plus limit/direction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanQuery {
    /// Range edges.
    pub bounds: Bounds,
    /// Maximum number of results.
    pub limit: Option<usize>,
    /// Walk the range from the top instead of the bottom.
    pub reverse: bool,
}

impl ScanQuery {
    /// Creates a query covering the whole key space.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Creates an equality query matching exactly `key`.
    #[must_use]
    pub fn exact(key: &Tuple) -> Self {
        Self {
            bounds: Bounds {
                gte: Some(key.clone()),
                lte: Some(key.clone()),
                ..Bounds::default()
            },
            ..Self::default()
        }
    }
}
