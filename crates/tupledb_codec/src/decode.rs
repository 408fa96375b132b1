//! Decoding of order-preserving value and tuple encodings.

use crate::encode::{
    ordered_bits_to_f64, ESCAPE, TAG_ARRAY, TAG_BOOL, TAG_MAX, TAG_MIN, TAG_NULL, TAG_NUMBER,
    TAG_OBJECT, TAG_STRING, TERMINATOR,
};
use crate::error::{CodecError, CodecResult};
use crate::value::{Tuple, Value};

/// Decodes a single value from its complete byte encoding.
///
/// # Errors
///
/// Returns an error if the input is empty, truncated, carries an unknown
/// tag, or has trailing bytes after the value.
pub fn decode_value(bytes: &[u8]) -> CodecResult<Value> {
    let (&tag, payload) = bytes.split_first().ok_or(CodecError::UnexpectedEnd)?;
    match tag {
        TAG_MIN => expect_empty(payload, Value::Min),
        TAG_NULL => expect_empty(payload, Value::Null),
        TAG_OBJECT => {
            let flat = decode_tuple(payload)?;
            if flat.len() % 2 != 0 {
                return Err(CodecError::OddObjectLength(flat.len()));
            }
            let mut pairs = Vec::with_capacity(flat.len() / 2);
            let mut items = flat.into_iter();
            while let (Some(key), Some(value)) = (items.next(), items.next()) {
                match key {
                    Value::String(k) => pairs.push((k, value)),
                    _ => return Err(CodecError::InvalidObjectKey),
                }
            }
            Ok(Value::Object(pairs))
        }
        TAG_ARRAY => Ok(Value::Array(decode_tuple(payload)?)),
        TAG_NUMBER => {
            let bits: [u8; 8] = payload
                .try_into()
                .map_err(|_| CodecError::UnexpectedEnd)?;
            Ok(Value::Number(ordered_bits_to_f64(u64::from_be_bytes(bits))))
        }
        TAG_STRING => Ok(Value::String(String::from_utf8(payload.to_vec())?)),
        TAG_BOOL => match payload {
            [0] => Ok(Value::Bool(false)),
            [1] => Ok(Value::Bool(true)),
            [b, ..] => Err(CodecError::InvalidBool(*b)),
            [] => Err(CodecError::UnexpectedEnd),
        },
        TAG_MAX => expect_empty(payload, Value::Max),
        other => Err(CodecError::UnknownTag(other)),
    }
}

/// Decodes a tuple from its byte key.
///
/// # Errors
///
/// Returns an error if any element is unterminated, has a dangling escape,
/// or fails to decode as a value.
pub fn decode_tuple(bytes: &[u8]) -> CodecResult<Tuple> {
    let mut tuple = Vec::new();
    let mut element = Vec::new();
    let mut iter = bytes.iter().copied().peekable();
    let mut in_element = false;

    while let Some(b) = iter.next() {
        if b == TERMINATOR {
            match iter.peek() {
                // Escaped terminator: a literal 0x00 inside the element.
                Some(&next) if next == ESCAPE => {
                    iter.next();
                    element.push(TERMINATOR);
                    in_element = true;
                }
                _ => {
                    tuple.push(decode_value(&element)?);
                    element.clear();
                    in_element = false;
                }
            }
        } else {
            element.push(b);
            in_element = true;
        }
    }

    if in_element || !element.is_empty() {
        return Err(CodecError::UnterminatedElement);
    }
    Ok(tuple)
}

fn expect_empty(payload: &[u8], value: Value) -> CodecResult<Value> {
    if payload.is_empty() {
        Ok(value)
    } else {
        Err(CodecError::TrailingBytes(payload.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{encode_tuple, encode_value};
    use crate::tuple;

    fn sample_values() -> Vec<Value> {
        vec![
            Value::Min,
            Value::Null,
            Value::object(vec![
                ("age".to_string(), Value::Number(30.0)),
                ("name".to_string(), Value::String("amy".to_string())),
            ]),
            Value::Array(vec![Value::Null, Value::Bool(true)]),
            Value::Number(-0.0),
            Value::Number(f64::INFINITY),
            Value::Number(1.25),
            Value::String("hello\u{0}world".to_string()),
            Value::Bool(false),
            Value::Bool(true),
            Value::Max,
        ]
    }

    #[test]
    fn value_roundtrip() {
        for value in sample_values() {
            let decoded = decode_value(&encode_value(&value)).unwrap();
            assert_eq!(decoded, value);
        }
    }

    #[test]
    fn tuple_roundtrip() {
        let tuples = vec![
            tuple![],
            tuple!["a"],
            tuple!["a", "b"],
            tuple!["ab"],
            tuple!["jon", 24.0, true],
            vec![Value::String("jon".into()), Value::Min],
            vec![Value::Array(sample_values())],
        ];
        for t in tuples {
            let decoded = decode_tuple(&encode_tuple(&t)).unwrap();
            assert_eq!(decoded, t);
        }
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(decode_value(&[]), Err(CodecError::UnexpectedEnd)));
    }

    #[test]
    fn unknown_tag_is_an_error() {
        assert!(matches!(
            decode_value(&[0x7f]),
            Err(CodecError::UnknownTag(0x7f))
        ));
    }

    #[test]
    fn unterminated_element_is_an_error() {
        let mut encoded = encode_tuple(&tuple!["a"]);
        encoded.pop();
        assert!(matches!(
            decode_tuple(&encoded),
            Err(CodecError::UnterminatedElement)
        ));
    }

    #[test]
    fn null_with_payload_is_an_error() {
        assert!(matches!(
            decode_value(&[0x02, 0x00]),
            Err(CodecError::TrailingBytes(1))
        ));
    }

    #[test]
    fn encoded_order_matches_value_order() {
        let values = sample_values();
        for a in &values {
            for b in &values {
                assert_eq!(
                    encode_value(a).cmp(&encode_value(b)),
                    a.cmp(b),
                    "byte order disagrees with value order for {a:?} vs {b:?}"
                );
            }
        }
    }

    #[test]
    fn encoded_tuple_order_matches_tuple_order() {
        let tuples = vec![
            tuple![],
            tuple!["a"],
            tuple!["a", "a"],
            tuple!["a", "a\u{0}"],
            tuple!["a", "b"],
            tuple!["a\u{0}"],
            tuple!["ab"],
            vec![Value::String("a".into()), Value::Min],
            vec![Value::String("a".into()), Value::Max],
            tuple![0.0, "x"],
            tuple![1.0],
        ];
        for a in &tuples {
            for b in &tuples {
                assert_eq!(
                    encode_tuple(a).cmp(&encode_tuple(b)),
                    a.cmp(b),
                    "byte order disagrees with tuple order for {a:?} vs {b:?}"
                );
            }
        }
    }
}
