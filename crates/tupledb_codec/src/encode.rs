//! Order-preserving encoding of values and tuples.
//!
//! Each value is prefixed with a single type-tag byte chosen so that tag
//! order equals the type-rank order of [`Value`]. Tuples append a `0x00`
//! terminator after each element and escape embedded `0x00` bytes as
//! `0x00 0xFF`, so concatenation stays unambiguous and bytewise comparison
//! of encodings equals tuple comparison.

use crate::value::Value;

/// Terminator byte appended after every tuple element.
pub(crate) const TERMINATOR: u8 = 0x00;
/// Byte that follows an escaped terminator inside an element.
pub(crate) const ESCAPE: u8 = 0xFF;

pub(crate) const TAG_MIN: u8 = 0x01;
pub(crate) const TAG_NULL: u8 = 0x02;
pub(crate) const TAG_OBJECT: u8 = 0x03;
pub(crate) const TAG_ARRAY: u8 = 0x04;
pub(crate) const TAG_NUMBER: u8 = 0x05;
pub(crate) const TAG_STRING: u8 = 0x06;
pub(crate) const TAG_BOOL: u8 = 0x07;
pub(crate) const TAG_MAX: u8 = 0x08;

/// Encodes a single value to its order-preserving byte form.
#[must_use]
pub fn encode_value(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    write_value(&mut out, value);
    out
}

/// Encodes a tuple to an order-preserving byte key.
///
/// For all tuples `a`, `b`: `encode_tuple(a).cmp(&encode_tuple(b)) ==
/// a.cmp(b)`, and a strict element-prefix is a strict byte-prefix.
#[must_use]
pub fn encode_tuple(tuple: &[Value]) -> Vec<u8> {
    let mut out = Vec::new();
    for value in tuple {
        let element = encode_value(value);
        write_escaped(&mut out, &element);
        out.push(TERMINATOR);
    }
    out
}

fn write_value(out: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Min => out.push(TAG_MIN),
        Value::Null => out.push(TAG_NULL),
        Value::Object(pairs) => {
            out.push(TAG_OBJECT);
            // Flatten sorted entries to [k1, v1, k2, v2, ...] and reuse the
            // tuple framing; entry order then matches object order.
            let mut flat = Vec::with_capacity(pairs.len() * 2);
            for (key, val) in pairs {
                flat.push(Value::String(key.clone()));
                flat.push(val.clone());
            }
            out.extend_from_slice(&encode_tuple(&flat));
        }
        Value::Array(items) => {
            out.push(TAG_ARRAY);
            out.extend_from_slice(&encode_tuple(items));
        }
        Value::Number(n) => {
            out.push(TAG_NUMBER);
            out.extend_from_slice(&f64_to_ordered_bits(*n).to_be_bytes());
        }
        Value::String(s) => {
            out.push(TAG_STRING);
            out.extend_from_slice(s.as_bytes());
        }
        Value::Bool(b) => {
            out.push(TAG_BOOL);
            out.push(u8::from(*b));
        }
        Value::Max => out.push(TAG_MAX),
    }
}

fn write_escaped(out: &mut Vec<u8>, bytes: &[u8]) {
    for &b in bytes {
        out.push(b);
        if b == TERMINATOR {
            out.push(ESCAPE);
        }
    }
}

/// Maps an f64 to a u64 whose unsigned order equals the IEEE-754 total
/// order: flip all bits for negatives, flip the sign bit otherwise.
pub(crate) fn f64_to_ordered_bits(n: f64) -> u64 {
    let bits = n.to_bits();
    if bits >> 63 == 1 {
        !bits
    } else {
        bits ^ (1 << 63)
    }
}

/// Inverse of [`f64_to_ordered_bits`].
pub(crate) fn ordered_bits_to_f64(key: u64) -> f64 {
    let bits = if key >> 63 == 1 { key ^ (1 << 63) } else { !key };
    f64::from_bits(bits)
}
