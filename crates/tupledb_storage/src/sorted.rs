//! Binary-search primitives over tuple-keyed sorted vectors.
//!
//! Every ordered collection in the system - backend rows, transaction write
//! buffers, the listener index - is a `Vec` kept in strictly ascending key
//! order and manipulated through these operations.

use crate::error::{StorageError, StorageResult};
use crate::types::{KeyValuePair, ScanQuery};
use tupledb_codec::Tuple;

/// Anything stored in a sorted vector under a tuple key.
pub trait TupleKeyed {
    /// The key this item is ordered by.
    fn key(&self) -> &Tuple;
}

impl TupleKeyed for KeyValuePair {
    fn key(&self) -> &Tuple {
        &self.key
    }
}

impl TupleKeyed for Tuple {
    fn key(&self) -> &Tuple {
        self
    }
}

/// Outcome of a binary search: the key's index, or the index it would be
/// inserted at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchResult {
    /// The key exists at this index.
    Found(usize),
    /// The key is absent; inserting at this index keeps the order.
    Closest(usize),
}

/// Binary-searches a sorted slice for a key.
pub fn search<T: TupleKeyed>(items: &[T], key: &Tuple) -> SearchResult {
    match items.binary_search_by(|item| item.key().cmp(key)) {
        Ok(index) => SearchResult::Found(index),
        Err(index) => SearchResult::Closest(index),
    }
}

/// Inserts an item, replacing any existing item with the same key.
///
/// Returns the replaced item, if any.
pub fn upsert<T: TupleKeyed>(items: &mut Vec<T>, item: T) -> Option<T> {
    match search(items, item.key()) {
        SearchResult::Found(index) => Some(std::mem::replace(&mut items[index], item)),
        SearchResult::Closest(index) => {
            items.insert(index, item);
            None
        }
    }
}

/// Removes the item with the given key, if present.
pub fn remove<T: TupleKeyed>(items: &mut Vec<T>, key: &Tuple) -> Option<T> {
    match search(items, key) {
        SearchResult::Found(index) => Some(items.remove(index)),
        SearchResult::Closest(_) => None,
    }
}

/// Checks whether an item with the given key exists.
pub fn contains<T: TupleKeyed>(items: &[T], key: &Tuple) -> bool {
    matches!(search(items, key), SearchResult::Found(_))
}

/// Scans a sorted slice for the items inside a query's bounds.
///
/// Runs in O(log n + k): each edge is located by binary search and only
/// the k result items are walked. All four edges apply independently, so a
/// query carrying both `gt` and `gte` (or `lt` and `lte`) yields their
/// intersection, matching [`Bounds::contains`]. Results come back in
/// ascending key order, or descending when `query.reverse` is set,
/// truncated to `query.limit`.
///
/// # Errors
///
/// Returns [`StorageError::InvalidBounds`] when the effective lower bound
/// sorts above the effective upper bound.
///
/// [`Bounds::contains`]: crate::Bounds::contains
pub fn scan<'a, T: TupleKeyed>(items: &'a [T], query: &ScanQuery) -> StorageResult<Vec<&'a T>> {
    let lower = query
        .bounds
        .gt
        .as_ref()
        .into_iter()
        .chain(query.bounds.gte.as_ref())
        .max();
    let upper = query
        .bounds
        .lt
        .as_ref()
        .into_iter()
        .chain(query.bounds.lte.as_ref())
        .min();
    if let (Some(lower), Some(upper)) = (lower, upper) {
        if lower > upper {
            return Err(StorageError::InvalidBounds);
        }
    }

    let mut start = 0;
    if let Some(gt) = &query.bounds.gt {
        start = start.max(match search(items, gt) {
            SearchResult::Found(i) => i + 1,
            SearchResult::Closest(i) => i,
        });
    }
    if let Some(gte) = &query.bounds.gte {
        start = start.max(match search(items, gte) {
            SearchResult::Found(i) | SearchResult::Closest(i) => i,
        });
    }

    let mut end = items.len();
    if let Some(lt) = &query.bounds.lt {
        end = end.min(match search(items, lt) {
            SearchResult::Found(i) | SearchResult::Closest(i) => i,
        });
    }
    if let Some(lte) = &query.bounds.lte {
        end = end.min(match search(items, lte) {
            SearchResult::Found(i) => i + 1,
            SearchResult::Closest(i) => i,
        });
    }

    if start >= end {
        return Ok(Vec::new());
    }

    let range = &items[start..end];
    let take = query.limit.unwrap_or(range.len());
    let result = if query.reverse {
        range.iter().rev().take(take).collect()
    } else {
        range.iter().take(take).collect()
    };
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Bounds;
    use tupledb_codec::{tuple, Value};

    fn rows() -> Vec<KeyValuePair> {
        // Inserted out of order on purpose.
        let mut items = Vec::new();
        for key in [
            tuple!["a", "c", "c"],
            tuple!["a", "a", "a"],
            tuple!["a", "b", "c"],
            tuple!["a", "a", "c"],
            tuple!["a", "c", "a"],
            tuple!["a", "a", "b"],
            tuple!["a", "b", "a"],
            tuple!["a", "c", "b"],
            tuple!["a", "b", "b"],
        ] {
            upsert(&mut items, KeyValuePair::new(key, Value::Null));
        }
        items
    }

    fn keys(items: &[&KeyValuePair]) -> Vec<Tuple> {
        items.iter().map(|pair| pair.key.clone()).collect()
    }

    #[test]
    fn upsert_keeps_ascending_order() {
        let items = rows();
        for pair in items.windows(2) {
            assert!(pair[0].key < pair[1].key);
        }
        assert_eq!(items.len(), 9);
    }

    #[test]
    fn upsert_replaces_existing_key() {
        let mut items = rows();
        let replaced = upsert(
            &mut items,
            KeyValuePair::new(tuple!["a", "a", "a"], Value::Bool(true)),
        );
        assert_eq!(replaced.map(|p| p.value), Some(Value::Null));
        assert_eq!(items.len(), 9);
    }

    #[test]
    fn remove_absent_is_noop() {
        let mut items = rows();
        assert!(remove(&mut items, &tuple!["zzz"]).is_none());
        assert_eq!(items.len(), 9);
        assert!(remove(&mut items, &tuple!["a", "b", "b"]).is_some());
        assert_eq!(items.len(), 8);
    }

    #[test]
    fn contains_existing_key() {
        let items = rows();
        assert!(contains(&items, &tuple!["a", "c", "c"]));
        assert!(!contains(&items, &tuple!["a", "c"]));
    }

    #[test]
    fn full_scan_returns_sorted_items() {
        let items = rows();
        let result = scan(&items, &ScanQuery::all()).unwrap();
        assert_eq!(result.len(), 9);
        assert_eq!(result[0].key, tuple!["a", "a", "a"]);
        assert_eq!(result[8].key, tuple!["a", "c", "c"]);
    }

    #[test]
    fn scan_with_sentinel_padded_gt_skips_group() {
        let items = rows();
        // Everything strictly after the ["a", "a"] group.
        let query = ScanQuery {
            bounds: Bounds {
                gt: Some(vec![
                    Value::String("a".into()),
                    Value::String("a".into()),
                    Value::Max,
                ]),
                ..Bounds::default()
            },
            ..ScanQuery::default()
        };
        let result = scan(&items, &query).unwrap();
        assert_eq!(
            keys(&result),
            vec![
                tuple!["a", "b", "a"],
                tuple!["a", "b", "b"],
                tuple!["a", "b", "c"],
                tuple!["a", "c", "a"],
                tuple!["a", "c", "b"],
                tuple!["a", "c", "c"],
            ]
        );
    }

    #[test]
    fn scan_gte_lte_inclusive() {
        let items = rows();
        let query = ScanQuery {
            bounds: Bounds {
                gte: Some(tuple!["a", "a", "c"]),
                lte: Some(tuple!["a", "b", "b"]),
                ..Bounds::default()
            },
            ..ScanQuery::default()
        };
        let result = scan(&items, &query).unwrap();
        assert_eq!(
            keys(&result),
            vec![tuple!["a", "a", "c"], tuple!["a", "b", "a"], tuple!["a", "b", "b"]]
        );
    }

    #[test]
    fn scan_gt_lt_exclusive() {
        let items = rows();
        let query = ScanQuery {
            bounds: Bounds {
                gt: Some(tuple!["a", "a", "c"]),
                lt: Some(tuple!["a", "b", "b"]),
                ..Bounds::default()
            },
            ..ScanQuery::default()
        };
        let result = scan(&items, &query).unwrap();
        assert_eq!(keys(&result), vec![tuple!["a", "b", "a"]]);
    }

    #[test]
    fn scan_intersects_duplicate_edges() {
        let items = rows();
        // Both lower and both upper edges given; the tighter one wins on
        // each side, matching Bounds::contains.
        let query = ScanQuery {
            bounds: Bounds {
                gt: Some(tuple!["a", "a", "a"]),
                gte: Some(tuple!["a", "b", "a"]),
                lt: Some(tuple!["a", "c", "c"]),
                lte: Some(tuple!["a", "b", "c"]),
            },
            ..ScanQuery::default()
        };
        let result = scan(&items, &query).unwrap();
        assert_eq!(
            keys(&result),
            vec![tuple!["a", "b", "a"], tuple!["a", "b", "b"], tuple!["a", "b", "c"]]
        );
        for pair in &result {
            assert!(query.bounds.contains(&pair.key));
        }
    }

    #[test]
    fn scan_reverse_and_limit() {
        let items = rows();
        let query = ScanQuery {
            reverse: true,
            limit: Some(2),
            ..ScanQuery::default()
        };
        let result = scan(&items, &query).unwrap();
        assert_eq!(keys(&result), vec![tuple!["a", "c", "c"], tuple!["a", "c", "b"]]);
    }

    #[test]
    fn scan_invalid_bounds_is_an_error() {
        let items = rows();
        let query = ScanQuery {
            bounds: Bounds {
                gte: Some(tuple!["a", "c"]),
                lte: Some(tuple!["a", "a"]),
                ..Bounds::default()
            },
            ..ScanQuery::default()
        };
        assert!(matches!(
            scan(&items, &query),
            Err(StorageError::InvalidBounds)
        ));
    }

    #[test]
    fn scan_empty_range_is_empty_not_error() {
        let items = rows();
        let query = ScanQuery {
            bounds: Bounds {
                gt: Some(tuple!["a", "b", "a"]),
                lt: Some(tuple!["a", "b", "a"]),
                ..Bounds::default()
            },
            ..ScanQuery::default()
        };
        assert!(scan(&items, &query).unwrap().is_empty());
    }
}
