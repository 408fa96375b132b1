//! # TupleDB Codec
//!
//! Value model and order-preserving tuple codec for TupleDB.
//!
//! This crate defines the dynamic [`Value`] domain, its total order, and a
//! byte encoding whose bytewise comparison equals value comparison:
//!
//! ```text
//! a.cmp(&b) == encode_value(&a).cmp(&encode_value(&b))
//! ```
//!
//! The same property holds for tuples under [`encode_tuple`], which is the
//! central correctness invariant of the whole system: the in-memory
//! comparator and the persisted key order can never disagree.
//!
//! ## Usage
//!
//! ```
//! use tupledb_codec::{decode_tuple, encode_tuple, tuple};
//!
//! let t = tuple!["jon", 24.0, true];
//! let key = encode_tuple(&t);
//! assert_eq!(decode_tuple(&key).unwrap(), t);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decode;
mod encode;
mod error;
mod json;
mod value;

pub use decode::{decode_tuple, decode_value};
pub use encode::{encode_tuple, encode_value};
pub use error::{CodecError, CodecResult};
pub use json::{value_from_json, value_to_json};
pub use value::{Tuple, Value};
