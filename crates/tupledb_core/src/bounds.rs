//! Normalization of user-facing scan arguments into canonical bounds.
//!
//! A prefix scan is expressed purely in terms of the open/closed range
//! primitives used everywhere else: the prefix is concatenated ahead of any
//! explicit range fragment, and a bare prefix synthesizes
//! `gte = prefix` / `lte = prefix + [Max]`.

use tupledb_codec::{Tuple, Value};
use tupledb_storage::{Bounds, ScanQuery};

/// A user-facing range query: optional prefix plus range fragments.
///
/// Fragments given alongside a `prefix` are interpreted relative to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanArgs {
    /// Restrict the scan to tuples under this prefix.
    pub prefix: Option<Tuple>,
    /// Exclusive lower fragment.
    pub gt: Option<Tuple>,
    /// Inclusive lower fragment.
    pub gte: Option<Tuple>,
    /// Exclusive upper fragment.
    pub lt: Option<Tuple>,
    /// Inclusive upper fragment.
    pub lte: Option<Tuple>,
    /// Maximum number of results.
    pub limit: Option<usize>,
    /// Walk the range from the top instead of the bottom.
    pub reverse: bool,
}

impl ScanArgs {
    /// Arguments selecting the whole key space.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Arguments selecting everything under a prefix.
    #[must_use]
    pub fn prefix(prefix: Tuple) -> Self {
        Self {
            prefix: Some(prefix),
            ..Self::default()
        }
    }

    /// Normalizes these arguments into a canonical query over full tuples.
    #[must_use]
    pub fn normalize(&self) -> ScanQuery {
        let mut bounds = Bounds {
            gt: self.gt.clone(),
            gte: self.gte.clone(),
            lt: self.lt.clone(),
            lte: self.lte.clone(),
        };

        if let Some(prefix) = &self.prefix {
            bounds.gt = bounds.gt.map(|frag| concat(prefix, &frag));
            bounds.gte = bounds.gte.map(|frag| concat(prefix, &frag));
            bounds.lt = bounds.lt.map(|frag| concat(prefix, &frag));
            bounds.lte = bounds.lte.map(|frag| concat(prefix, &frag));

            if bounds.gt.is_none() && bounds.gte.is_none() {
                bounds.gte = Some(prefix.clone());
            }
            if bounds.lt.is_none() && bounds.lte.is_none() {
                bounds.lte = Some(concat(prefix, &[Value::Max]));
            }
        }

        ScanQuery {
            bounds,
            limit: self.limit,
            reverse: self.reverse,
        }
    }
}

fn concat(prefix: &[Value], fragment: &[Value]) -> Tuple {
    let mut out = Vec::with_capacity(prefix.len() + fragment.len());
    out.extend_from_slice(prefix);
    out.extend_from_slice(fragment);
    out
}
