// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Native CBOR data model produced by a backend decode and consumed by a backend encode.

use num_bigint::BigInt;

/// A decoded CBOR data item.
///
/// Invariants:
///
/// - `Map` keeps entries in insertion (wire) order and may hold duplicate keys;
///   uniqueness is left to the backend.
/// - `Integer` is arbitrary precision. Bignum tags 2/3 are folded into it by the
///   backend, so a `Tag(2, _)` only survives when its content is not a byte string.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// `null` (simple value 22).
    Null,
    /// `true` / `false`.
    Bool(bool),
    /// Integer of any magnitude.
    Integer(BigInt),
    /// IEEE 754 double (half and single precision widen on decode).
    Float(f64),
    /// Raw byte string.
    Bytes(Vec<u8>),
    /// UTF-8 text string.
    Text(String),
    /// Ordered sequence.
    Array(Vec<Value>),
    /// Ordered key/value pairs with keys of any type.
    Map(Vec<(Value, Value)>),
    /// Tag number plus the wrapped item.
    Tag(u64, Box<Value>),
    /// `undefined` (simple value 23), distinct from `Null`.
    Undefined,
}

impl Value {
    /// Short name of the variant, used as the `kind` field of the codec service's logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Bytes(_) => "bytes",
            Self::Text(_) => "text",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
            Self::Tag(..) => "tag",
            Self::Undefined => "undefined",
        }
    }

    /// Wrap `inner` in tag `tag`.
    pub fn tagged(tag: u64, inner: Value) -> Self {
        Self::Tag(tag, Box::new(inner))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(BigInt::from(n))
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Self::Integer(BigInt::from(n))
    }
}

impl From<BigInt> for Value {
    fn from(n: BigInt) -> Self {
        Self::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(items)
    }
}

impl From<Vec<(Value, Value)>> for Value {
    fn from(entries: Vec<(Value, Value)>) -> Self {
        Self::Map(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_every_variant() {
        let cases = [
            (Value::Null, "null"),
            (Value::from(true), "bool"),
            (Value::from(BigInt::from(-1)), "integer"),
            (Value::from(0.5), "float"),
            (Value::from(vec![0u8]), "bytes"),
            (Value::from("a"), "text"),
            (Value::from(Vec::<Value>::new()), "array"),
            (Value::from(Vec::<(Value, Value)>::new()), "map"),
            (Value::tagged(1, Value::Null), "tag"),
            (Value::Undefined, "undefined"),
        ];
        for (value, kind) in cases {
            assert_eq!(value.kind(), kind);
        }
    }
}
