//! Error types for the tuple codec.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while encoding or decoding tuples.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Input ended before a complete value was decoded.
    #[error("unexpected end of input")]
    UnexpectedEnd,

    /// Unknown type-tag byte.
    #[error("unknown type tag: 0x{0:02x}")]
    UnknownTag(u8),

    /// A boolean payload byte was neither 0 nor 1.
    #[error("invalid boolean payload: 0x{0:02x}")]
    InvalidBool(u8),

    /// A string payload was not valid UTF-8.
    #[error("invalid UTF-8 in string payload: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// Extra bytes remained after a complete value was decoded.
    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),

    /// A tuple element was not terminated.
    #[error("unterminated tuple element")]
    UnterminatedElement,

    /// An object encoding held an odd number of flattened entries.
    #[error("object encoding has odd entry count: {0}")]
    OddObjectLength(usize),

    /// An object key decoded to a non-string value.
    #[error("object key is not a string")]
    InvalidObjectKey,

    /// A `Min`/`Max` sentinel reached a representation that cannot hold it.
    #[error("sentinel value is not representable here")]
    UnrepresentableSentinel,

    /// A JSON number was outside the representable f64 domain.
    #[error("JSON number is not representable as f64")]
    UnrepresentableNumber,
}
