//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random tuples, values, and
//! write-sets that maintain required invariants (no sentinels in stored
//! data, finite numbers).

use proptest::prelude::*;
use tupledb_codec::{Tuple, Value};
use tupledb_storage::{KeyValuePair, WriteOps};

/// Strategy for storable scalar values (no sentinels, no NaN).
pub fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<f64>()
            .prop_filter("stored numbers must not be NaN", |n| !n.is_nan())
            .prop_map(Value::Number),
        string_strategy().prop_map(Value::String),
    ]
}

/// Strategy for short strings, biased toward collisions and edge bytes.
pub fn string_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-c\\x00-\\x10]{0,8}").expect("Invalid regex")
}

/// Strategy for storable values, including nested arrays and objects.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    scalar_strategy().prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::vec(("[a-c]{1,4}", inner), 0..4).prop_map(Value::object),
        ]
    })
}

/// Strategy for tuple keys of storable scalars.
pub fn tuple_strategy() -> impl Strategy<Value = Tuple> {
    prop::collection::vec(scalar_strategy(), 1..4)
}

/// Strategy for write-sets over a narrow key space.
///
/// Keys are deliberately drawn from a small alphabet so that sets and
/// removes collide with earlier operations often.
pub fn write_ops_strategy() -> impl Strategy<Value = WriteOps> {
    (
        prop::collection::vec((tuple_strategy(), value_strategy()), 0..6),
        prop::collection::vec(tuple_strategy(), 0..4),
    )
        .prop_map(|(sets, removes)| {
            let set = sets
                .into_iter()
                .map(|(key, value)| KeyValuePair::new(key, value))
                .collect::<Vec<_>>();
            // A key in both lists would leave apply order ambiguous.
            let remove = removes
                .into_iter()
                .filter(|key| !set.iter().any(|pair| &pair.key == key))
                .collect();
            WriteOps { set, remove }
        })
}
