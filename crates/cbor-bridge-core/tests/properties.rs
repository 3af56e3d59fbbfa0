// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Property checks for the translator and the ciborium backend.
#![allow(clippy::unwrap_used)]

use cbor_bridge_core::{
    from_json_safe, round_trip_eq, to_json_safe, CborBackend, CiboriumBackend, CodecService,
    Value, MAX_SAFE_INTEGER,
};
use num_bigint::BigInt;
use proptest::prelude::*;
use serde_json::Value as JsonValue;

fn big_integer() -> impl Strategy<Value = BigInt> {
    prop_oneof![
        any::<i64>().prop_map(BigInt::from),
        any::<i128>().prop_map(BigInt::from),
        (any::<bool>(), prop::collection::vec(any::<u8>(), 0..24)).prop_map(|(neg, mag)| {
            let n = BigInt::from_bytes_be(num_bigint::Sign::Plus, &mag);
            if neg {
                -n
            } else {
                n
            }
        }),
    ]
}

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        Just(Value::Undefined),
        any::<bool>().prop_map(Value::Bool),
        big_integer().prop_map(Value::Integer),
        any::<f64>().prop_map(Value::Float),
        Just(Value::Float(f64::NAN)),
        Just(Value::Float(f64::NEG_INFINITY)),
        prop::collection::vec(any::<u8>(), 0..16).prop_map(Value::Bytes),
        "[a-z0-9 ]{0,12}".prop_map(Value::Text),
    ]
}

/// Values whose map keys survive JSON without collisions.
fn value() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner.clone(), 0..5).prop_map(|m| {
                Value::Map(m.into_iter().map(|(k, v)| (Value::Text(k), v)).collect())
            }),
            prop::collection::btree_map(any::<i64>(), inner.clone(), 0..5).prop_map(|m| {
                Value::Map(m.into_iter().map(|(k, v)| (Value::from(k), v)).collect())
            }),
            // tags 2 and 3 over bytes would fold into integers on decode
            (4_u64.., inner).prop_map(|(tag, v)| Value::tagged(tag, v)),
        ]
    })
}

proptest! {
    #[test]
    fn json_safe_round_trip_is_lossless(v in value()) {
        let json = to_json_safe(&v);
        let back = from_json_safe(json).unwrap();
        prop_assert!(round_trip_eq(&v, &back), "{v:?} came back as {back:?}");
    }

    #[test]
    fn json_safe_form_survives_text_serialization(v in value()) {
        let json = to_json_safe(&v);
        let text = serde_json::to_string(&json).unwrap();
        let reparsed: JsonValue = serde_json::from_str(&text).unwrap();
        let back = from_json_safe(reparsed).unwrap();
        prop_assert!(round_trip_eq(&v, &back));
    }

    #[test]
    fn integers_switch_to_strings_past_the_safe_bound(n in big_integer()) {
        let safe = BigInt::from(-MAX_SAFE_INTEGER) <= n && n <= BigInt::from(MAX_SAFE_INTEGER);
        match to_json_safe(&Value::Integer(n.clone())) {
            JsonValue::Number(num) => {
                prop_assert!(safe);
                prop_assert_eq!(BigInt::from(num.as_i64().unwrap()), n);
            }
            JsonValue::String(s) => {
                prop_assert!(!safe);
                prop_assert_eq!(s.parse::<BigInt>().unwrap(), n);
            }
            other => prop_assert!(false, "unexpected {other}"),
        }
    }

    #[test]
    fn backend_encode_then_decode_preserves_value(v in value()) {
        let bytes = CiboriumBackend.encode(&v).unwrap();
        let back = CiboriumBackend.decode(&bytes).unwrap();
        prop_assert!(round_trip_eq(&v, &back), "{v:?} came back as {back:?}");
    }

    #[test]
    fn decode_never_panics_on_arbitrary_bytes(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let service = CodecService::default();
        let env = service.decode(&hex::encode(&bytes));
        if env.is_success() {
            prop_assert!(env.duration_ms().unwrap() >= 0.0);
        }
    }
}
