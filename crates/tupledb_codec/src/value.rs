//! Dynamic tuple value type and its total order.

use std::cmp::Ordering;

/// A dynamic, JSON-like value that can appear inside a tuple.
///
/// Values are totally ordered by a fixed type rank:
///
/// ```text
/// Min < Null < Object < Array < Number < String < Bool < Max
/// ```
///
/// with same-type values compared structurally. The `Min` and `Max`
/// sentinels bound the whole value universe and are only legal inside
/// scan-bound tuples, never inside stored tuples.
#[derive(Debug, Clone)]
pub enum Value {
    /// Sentinel that sorts before every other value.
    Min,
    /// Null value.
    Null,
    /// Ordered mapping from string keys to values (entries sorted by key).
    Object(Vec<(String, Value)>),
    /// Ordered sequence of values.
    Array(Vec<Value>),
    /// Floating-point number (IEEE-754 double).
    Number(f64),
    /// UTF-8 text.
    String(String),
    /// Boolean value.
    Bool(bool),
    /// Sentinel that sorts after every other value.
    Max,
}

/// An ordered, finite sequence of values; the unit of key identity.
///
/// `Vec`'s lexicographic `Ord` is exactly the required tuple order:
/// element-wise comparison, with a strict prefix sorting first.
pub type Tuple = Vec<Value>;

impl Value {
    /// Creates an object value with entries sorted by key.
    ///
    /// A key that appears more than once keeps its last entry.
    pub fn object(mut pairs: Vec<(String, Value)>) -> Self {
        // Reverse first so that, under the stable sort, the last insertion
        // of a duplicated key comes first and survives the dedup.
        pairs.reverse();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        pairs.dedup_by(|a, b| a.0 == b.0);
        Value::Object(pairs)
    }

    /// Rank of this value's type in the global order.
    pub(crate) fn type_rank(&self) -> u8 {
        match self {
            Value::Min => 0,
            Value::Null => 1,
            Value::Object(_) => 2,
            Value::Array(_) => 3,
            Value::Number(_) => 4,
            Value::String(_) => 5,
            Value::Bool(_) => 6,
            Value::Max => 7,
        }
    }

    /// Check if this value is one of the `Min`/`Max` sentinels.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Value::Min | Value::Max)
    }

    /// Check if this value contains a sentinel anywhere, including inside
    /// nested arrays and objects.
    #[must_use]
    pub fn has_sentinel(&self) -> bool {
        match self {
            Value::Min | Value::Max => true,
            Value::Array(items) => items.iter().any(Value::has_sentinel),
            Value::Object(pairs) => pairs.iter().any(|(_, v)| v.has_sentinel()),
            _ => false,
        }
    }

    /// Check if this value is null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get this value as a boolean, if it is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get this value as a number, if it is one.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as a string slice, if it is text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as an array, if it is one.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get this value as object entries, if it is an object.
    #[must_use]
    pub fn as_object(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Object(pairs) => Some(pairs),
            _ => None,
        }
    }

    /// Look up a key in this object value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(pairs) => pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        let rank = self.type_rank().cmp(&other.type_rank());
        if rank != Ordering::Equal {
            return rank;
        }
        match (self, other) {
            // Numbers use the IEEE-754 total order so that comparison agrees
            // bit-for-bit with the encoded key order (-0.0 sorts before 0.0).
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Array(a), Value::Array(b)) => a.cmp(b),
            // Entries are kept sorted by key, so slice order is: first
            // differing key, then its value, then entry count.
            (Value::Object(a), Value::Object(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Value::Null
    }
}

/// Builds a [`Tuple`] from a list of expressions convertible to [`Value`].
///
/// ```
/// use tupledb_codec::{tuple, Value};
///
/// let t = tuple!["jon", 24.0, true];
/// assert_eq!(t[0], Value::String("jon".to_string()));
/// ```
#[macro_export]
macro_rules! tuple {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($item:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::from($item)),+]
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_rank_total_order() {
        let ascending = vec![
            Value::Min,
            Value::Null,
            Value::object(vec![]),
            Value::Array(vec![]),
            Value::Number(1.5),
            Value::String("a".to_string()),
            Value::Bool(false),
            Value::Max,
        ];
        for pair in ascending.windows(2) {
            assert!(pair[0] < pair[1], "{:?} should sort before {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn number_order_spans_ieee_range() {
        let ascending = vec![
            f64::NEG_INFINITY,
            f64::MIN,
            -1.0,
            -f64::MIN_POSITIVE,
            -0.0,
            0.0,
            f64::MIN_POSITIVE,
            1.0,
            f64::MAX,
            f64::INFINITY,
        ];
        for pair in ascending.windows(2) {
            assert!(Value::Number(pair[0]) < Value::Number(pair[1]));
        }
    }

    #[test]
    fn tuple_prefix_sorts_first() {
        let short = tuple!["jon"];
        let long = tuple!["jon", "smith"];
        assert!(short < long);
    }

    #[test]
    fn sentinel_padding_flips_prefix_order() {
        // ["jon"] sorts before ["jon", "smith"], but ["jon", Min] through
        // ["jon", Max] brackets everything under the prefix.
        let bare = tuple!["jon"];
        let lower = vec![Value::String("jon".into()), Value::Min];
        let upper = vec![Value::String("jon".into()), Value::Max];
        let inside = tuple!["jon", "smith"];
        assert!(bare < lower);
        assert!(lower < inside);
        assert!(inside < upper);
    }

    #[test]
    fn object_entries_are_sorted() {
        let obj = Value::object(vec![
            ("z".to_string(), Value::Number(1.0)),
            ("a".to_string(), Value::Number(2.0)),
        ]);
        let pairs = obj.as_object().unwrap();
        assert_eq!(pairs[0].0, "a");
        assert_eq!(pairs[1].0, "z");
    }

    #[test]
    fn object_duplicate_key_keeps_last() {
        let obj = Value::object(vec![
            ("k".to_string(), Value::Number(1.0)),
            ("k".to_string(), Value::Number(2.0)),
        ]);
        assert_eq!(obj.get("k"), Some(&Value::Number(2.0)));
        assert_eq!(obj.as_object().unwrap().len(), 1);
    }

    #[test]
    fn object_compare_by_key_then_value() {
        let a = Value::object(vec![("a".to_string(), Value::Number(1.0))]);
        let b = Value::object(vec![("a".to_string(), Value::Number(2.0))]);
        let c = Value::object(vec![("b".to_string(), Value::Number(0.0))]);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn shorter_object_prefix_sorts_first() {
        let a = Value::object(vec![("a".to_string(), Value::Number(1.0))]);
        let b = Value::object(vec![
            ("a".to_string(), Value::Number(1.0)),
            ("b".to_string(), Value::Null),
        ]);
        assert!(a < b);
    }

    #[test]
    fn negative_zero_sorts_before_positive_zero() {
        assert!(Value::Number(-0.0) < Value::Number(0.0));
        assert_ne!(Value::Number(-0.0), Value::Number(0.0));
    }

    #[test]
    fn has_sentinel_recurses() {
        assert!(Value::Min.has_sentinel());
        assert!(Value::Array(vec![Value::Null, Value::Max]).has_sentinel());
        assert!(Value::object(vec![("k".to_string(), Value::Min)]).has_sentinel());
        assert!(!Value::Array(vec![Value::Null]).has_sentinel());
    }

    #[test]
    fn from_impls() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(42.0), Value::Number(42.0));
        assert_eq!(Value::from(42i32), Value::Number(42.0));
        assert_eq!(Value::from("hi"), Value::String("hi".to_string()));
        assert_eq!(Value::from(()), Value::Null);
        assert_eq!(
            Value::from(vec![1i32, 2]),
            Value::Array(vec![Value::Number(1.0), Value::Number(2.0)])
        );
    }
}
