// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Bidirectional mapping between native CBOR values and JSON-safe values.
//!
//! JSON cannot express byte strings, tags, non-finite floats, `undefined` or
//! integers beyond ±(2^53-1) without loss, so those travel as reserved marker
//! objects or decimal strings:
//!
//! | Marker | Native |
//! |---|---|
//! | `{"__cbor_bytes__": "<hex>"}` | [`Value::Bytes`] |
//! | `{"__cbor_float__": "NaN" \| "Infinity" \| "-Infinity"}` | non-finite [`Value::Float`] |
//! | `{"__cbor_tag__": n, "__cbor_value__": v}` | [`Value::Tag`] |
//! | `{"__cbor_undefined__": true}` | [`Value::Undefined`] |
//!
//! An object is only treated as a marker when its key set is exactly one of
//! the shapes above. Anything else, including a lone `__cbor_tag__`, is an
//! ordinary map.
//!
//! The two directions are deliberately asymmetric for map keys:
//! [`to_json_safe`] stringifies non-text keys (hex for bytes, decimal for
//! integers, compact JSON for everything else) while [`from_json_safe`] always
//! yields text keys. Use [`round_trip_eq`] to compare across that boundary.

use num_bigint::BigInt;
use serde_json::{Map, Number, Value as JsonValue};

use crate::error::{BridgeError, Result};
use crate::value::Value;

/// Key of the byte-string marker; payload is lowercase hex.
pub const BYTES_MARKER: &str = "__cbor_bytes__";
/// Key of the non-finite float marker.
pub const FLOAT_MARKER: &str = "__cbor_float__";
/// Key holding the tag number of a tag marker.
pub const TAG_MARKER: &str = "__cbor_tag__";
/// Key holding the wrapped value of a tag marker.
pub const TAG_VALUE_MARKER: &str = "__cbor_value__";
/// Key of the undefined marker; payload is `true`.
pub const UNDEFINED_MARKER: &str = "__cbor_undefined__";

/// Largest integer magnitude emitted as a JSON number (`Number.MAX_SAFE_INTEGER`).
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

const NAN_LITERAL: &str = "NaN";
const INFINITY_LITERAL: &str = "Infinity";
const NEG_INFINITY_LITERAL: &str = "-Infinity";

/// Translate a native value into its JSON-safe form.
pub fn to_json_safe(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Integer(n) => integer_to_json(n),
        Value::Float(f) => float_to_json(*f),
        Value::Bytes(bytes) => marker(BYTES_MARKER, JsonValue::String(hex::encode(bytes))),
        Value::Text(s) => JsonValue::String(s.clone()),
        Value::Array(items) => JsonValue::Array(items.iter().map(to_json_safe).collect()),
        Value::Map(entries) => {
            let mut obj = Map::with_capacity(entries.len());
            for (k, v) in entries {
                obj.insert(map_key(k), to_json_safe(v));
            }
            JsonValue::Object(obj)
        }
        Value::Tag(tag, inner) => {
            let mut obj = Map::with_capacity(2);
            obj.insert(TAG_MARKER.to_owned(), JsonValue::from(*tag));
            obj.insert(TAG_VALUE_MARKER.to_owned(), to_json_safe(inner));
            JsonValue::Object(obj)
        }
        Value::Undefined => marker(UNDEFINED_MARKER, JsonValue::Bool(true)),
    }
}

/// Translate a JSON-safe value back into a native value.
///
/// Plain strings stay [`Value::Text`] even when they look numeric; callers
/// must use the markers for anything JSON cannot express directly.
pub fn from_json_safe(value: JsonValue) -> Result<Value> {
    Ok(match value {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(b),
        JsonValue::Number(n) => number_to_value(&n),
        JsonValue::String(s) => Value::Text(s),
        JsonValue::Array(items) => Value::Array(
            items
                .into_iter()
                .map(from_json_safe)
                .collect::<Result<Vec<_>>>()?,
        ),
        JsonValue::Object(obj) => match Shape::classify(obj) {
            Shape::Bytes(payload) => Value::Bytes(parse_bytes(payload)?),
            Shape::Float(payload) => Value::Float(parse_float(payload)?),
            Shape::Tag { tag, value } => {
                Value::Tag(parse_tag_number(tag)?, Box::new(from_json_safe(value)?))
            }
            Shape::Undefined(payload) => {
                if payload != JsonValue::Bool(true) {
                    return Err(BridgeError::MalformedMarker(format!(
                        "{UNDEFINED_MARKER} expects true, got {}",
                        json_kind(&payload)
                    )));
                }
                Value::Undefined
            }
            Shape::Object(obj) => Value::Map(
                obj.into_iter()
                    .map(|(k, v)| Ok((Value::Text(k), from_json_safe(v)?)))
                    .collect::<Result<Vec<_>>>()?,
            ),
        },
    })
}

/// Compare an original native value with the result of
/// `from_json_safe(to_json_safe(original))`.
///
/// Differences that the JSON-safe encoding introduces on purpose are accepted:
///
/// - NaN equals NaN;
/// - an integer beyond ±(2^53-1) equals the text of its decimal form;
/// - a non-text map key equals the text key [`to_json_safe`] produced for it.
pub fn round_trip_eq(original: &Value, restored: &Value) -> bool {
    match (original, restored) {
        (Value::Float(a), Value::Float(b)) => (a.is_nan() && b.is_nan()) || a == b,
        (Value::Integer(n), Value::Text(s)) => {
            !is_safe_integer(n) && s.parse::<BigInt>().is_ok_and(|parsed| &parsed == n)
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| round_trip_eq(x, y))
        }
        (Value::Map(a), Value::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b)
                    .all(|((ka, va), (kb, vb))| key_eq(ka, kb) && round_trip_eq(va, vb))
        }
        (Value::Tag(ta, a), Value::Tag(tb, b)) => ta == tb && round_trip_eq(a, b),
        (a, b) => a == b,
    }
}

/// The five shapes a JSON object can take, decided once per object.
enum Shape {
    Bytes(JsonValue),
    Float(JsonValue),
    Tag { tag: JsonValue, value: JsonValue },
    Undefined(JsonValue),
    Object(Map<String, JsonValue>),
}

impl Shape {
    fn classify(mut obj: Map<String, JsonValue>) -> Self {
        match obj.len() {
            1 => {
                if let Some(payload) = obj.remove(BYTES_MARKER) {
                    return Self::Bytes(payload);
                }
                if let Some(payload) = obj.remove(FLOAT_MARKER) {
                    return Self::Float(payload);
                }
                if let Some(payload) = obj.remove(UNDEFINED_MARKER) {
                    return Self::Undefined(payload);
                }
            }
            2 if obj.contains_key(TAG_MARKER) && obj.contains_key(TAG_VALUE_MARKER) => {
                if let (Some(tag), Some(value)) =
                    (obj.remove(TAG_MARKER), obj.remove(TAG_VALUE_MARKER))
                {
                    return Self::Tag { tag, value };
                }
            }
            _ => {}
        }
        Self::Object(obj)
    }
}

fn marker(key: &str, payload: JsonValue) -> JsonValue {
    let mut obj = Map::with_capacity(1);
    obj.insert(key.to_owned(), payload);
    JsonValue::Object(obj)
}

fn is_safe_integer(n: &BigInt) -> bool {
    i64::try_from(n).is_ok_and(|v| (-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(&v))
}

fn integer_to_json(n: &BigInt) -> JsonValue {
    match i64::try_from(n) {
        Ok(v) if (-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(&v) => JsonValue::from(v),
        _ => JsonValue::String(n.to_string()),
    }
}

fn float_to_json(f: f64) -> JsonValue {
    if f.is_nan() {
        return marker(FLOAT_MARKER, JsonValue::from(NAN_LITERAL));
    }
    if f.is_infinite() {
        let literal = if f.is_sign_positive() {
            INFINITY_LITERAL
        } else {
            NEG_INFINITY_LITERAL
        };
        return marker(FLOAT_MARKER, JsonValue::from(literal));
    }
    Number::from_f64(f).map_or(JsonValue::Null, JsonValue::Number)
}

fn map_key(key: &Value) -> String {
    match key {
        Value::Text(s) => s.clone(),
        Value::Bytes(bytes) => hex::encode(bytes),
        Value::Integer(n) => n.to_string(),
        other => to_json_safe(other).to_string(),
    }
}

fn key_eq(original: &Value, restored: &Value) -> bool {
    match restored {
        Value::Text(s) => map_key(original) == *s,
        other => round_trip_eq(original, other),
    }
}

fn number_to_value(n: &Number) -> Value {
    if let Some(i) = n.as_i64() {
        return Value::from(i);
    }
    if let Some(u) = n.as_u64() {
        return Value::from(u);
    }
    // without `arbitrary_precision` every other number is an f64
    Value::Float(n.as_f64().unwrap_or(f64::NAN))
}

fn parse_bytes(payload: JsonValue) -> Result<Vec<u8>> {
    let JsonValue::String(text) = payload else {
        return Err(BridgeError::MalformedMarker(format!(
            "{BYTES_MARKER} expects a hex string, got {}",
            json_kind(&payload)
        )));
    };
    hex::decode(&text).map_err(|err| BridgeError::MalformedMarker(format!("{BYTES_MARKER}: {err}")))
}

fn parse_float(payload: JsonValue) -> Result<f64> {
    match payload.as_str() {
        Some(NAN_LITERAL) => Ok(f64::NAN),
        Some(INFINITY_LITERAL) => Ok(f64::INFINITY),
        Some(NEG_INFINITY_LITERAL) => Ok(f64::NEG_INFINITY),
        _ => Err(BridgeError::MalformedMarker(format!(
            "{FLOAT_MARKER} expects \"NaN\", \"Infinity\" or \"-Infinity\", got {payload}"
        ))),
    }
}

fn parse_tag_number(tag: JsonValue) -> Result<u64> {
    tag.as_u64().ok_or_else(|| {
        BridgeError::MalformedMarker(format!(
            "{TAG_MARKER} expects an unsigned integer, got {tag}"
        ))
    })
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
