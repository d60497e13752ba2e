//! Host-side value representation.
//!
//! [`Value`] is the closed tagged union exchanged with the engine in both
//! directions: one variant per supported SQL value kind, converted through
//! the exhaustive mapping functions in [`mapping`].

pub mod mapping;

/// A dynamically typed SQL value.
///
/// `Integer` is the compact numeric form used when a decoded integer column
/// fits a signed 32-bit range; wider integers decode as `Float` unless the
/// statement was prepared in `bigint` mode, in which case they decode as
/// `BigInt`. On the encoding side `Integer` and `Float` both bind as
/// floating-point numerics, while `BigInt` binds as a 64-bit integer and
/// fails when the value does not fit losslessly.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Compact numeric (fits a signed 32-bit integer)
    Integer(i32),
    /// General numeric
    Float(f64),
    /// UTF-8 text
    Text(String),
    /// Binary blob (always an owned copy)
    Blob(Vec<u8>),
    /// Arbitrary-precision integer; must fit a signed 64-bit integer to bind
    BigInt(i128),
}

impl Value {
    /// Check whether the value is SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the value kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
            Value::BigInt(_) => "bigint",
        }
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::BigInt(value as i128)
    }
}

impl From<i128> for Value {
    fn from(value: i128) -> Self {
        Value::BigInt(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Blob(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Blob(value.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}
