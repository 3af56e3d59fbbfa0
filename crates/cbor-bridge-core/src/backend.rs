// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! CBOR backend seam and the default `ciborium-ll` implementation.
//!
//! A backend turns bytes into a [`Value`] and back. The codec service treats it
//! as a black box: every failure comes back as a [`BridgeError`] and is folded
//! into a failure envelope, never propagated.

use ciborium_ll::tag::{BIGNEG, BIGPOS};
use ciborium_ll::{simple, Decoder, Encoder, Header};
use num_bigint::{BigInt, Sign};
use serde::Serialize;

use crate::error::{BridgeError, Result};
use crate::value::Value;

/// Nesting budget for array/map/tag levels, in either direction.
///
/// A decoded item holds at most `MAX_NESTING - 1` container levels. With the
/// leaf marker object and the envelope (or request) object around it, the JSON
/// text stays under serde_json's default recursion limit of 128, so any decode
/// result can be posted back to `encode`.
pub const MAX_NESTING: usize = 120;

/// Upper bound on container pre-allocation taken from an untrusted length prefix.
const PREALLOC_LIMIT: usize = 1024;

/// Identity reported by transports on their health endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BackendInfo {
    /// Library name (e.g. `ciborium`).
    pub library: &'static str,
    /// Library version.
    pub version: &'static str,
    /// Implementation language tag.
    pub language: &'static str,
}

/// A CBOR codec that can be driven through the conformance protocol.
pub trait CborBackend: Send + Sync {
    /// Decode exactly one CBOR data item.
    fn decode(&self, bytes: &[u8]) -> Result<Value>;
    /// Encode a native value.
    fn encode(&self, value: &Value) -> Result<Vec<u8>>;
    /// Library identity for health reports.
    fn info(&self) -> BackendInfo;
}

/// Backend built on the `ciborium-ll` header-level codec.
///
/// Decoding folds bignum tags 2/3 over a byte string into [`Value::Integer`];
/// encoding emits them for integers outside `[-2^64, 2^64-1]`. Lengths are
/// always definite and floats use the shortest lossless width.
#[derive(Clone, Copy, Debug, Default)]
pub struct CiboriumBackend;

impl CborBackend for CiboriumBackend {
    fn decode(&self, bytes: &[u8]) -> Result<Value> {
        let mut decoder = Decoder::from(bytes);
        let value = read_value(&mut decoder, MAX_NESTING)?;
        let consumed = decoder.offset();
        if consumed != bytes.len() {
            return Err(BridgeError::BackendDecode(format!(
                "{} trailing bytes after value at offset {consumed}",
                bytes.len() - consumed
            )));
        }
        Ok(value)
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut encoder = Encoder::from(&mut out);
        write_value(&mut encoder, value, MAX_NESTING)?;
        Ok(out)
    }

    fn info(&self) -> BackendInfo {
        BackendInfo {
            library: "ciborium",
            version: "0.2",
            language: "rust",
        }
    }
}

type SliceDecoder<'a> = Decoder<&'a [u8]>;
type VecEncoder<'a> = Encoder<&'a mut Vec<u8>>;

fn decode_err(err: ciborium_ll::Error<std::io::Error>) -> BridgeError {
    match err {
        ciborium_ll::Error::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
            BridgeError::BackendDecode("unexpected end of input".into())
        }
        ciborium_ll::Error::Io(io) => BridgeError::BackendDecode(io.to_string()),
        ciborium_ll::Error::Syntax(offset) => {
            BridgeError::BackendDecode(format!("syntax error at offset {offset}"))
        }
    }
}

fn encode_err(err: std::io::Error) -> BridgeError {
    BridgeError::BackendEncode(err.to_string())
}

fn read_value(decoder: &mut SliceDecoder<'_>, depth: usize) -> Result<Value> {
    if depth == 0 {
        return Err(BridgeError::BackendDecode(format!(
            "nesting deeper than {MAX_NESTING} levels"
        )));
    }
    let offset = decoder.offset();
    match decoder.pull().map_err(decode_err)? {
        Header::Positive(n) => Ok(Value::from(n)),
        Header::Negative(n) => Ok(Value::Integer(-(BigInt::from(n) + 1u32))),
        Header::Float(f) => Ok(Value::Float(f)),
        Header::Simple(simple::FALSE) => Ok(Value::Bool(false)),
        Header::Simple(simple::TRUE) => Ok(Value::Bool(true)),
        Header::Simple(simple::NULL) => Ok(Value::Null),
        Header::Simple(simple::UNDEFINED) => Ok(Value::Undefined),
        Header::Simple(other) => Err(BridgeError::BackendDecode(format!(
            "unsupported simple value {other} at offset {offset}"
        ))),
        Header::Break => Err(BridgeError::BackendDecode(format!(
            "unexpected break at offset {offset}"
        ))),
        Header::Bytes(len) => read_bytes(decoder, len).map(Value::Bytes),
        Header::Text(len) => read_text(decoder, len).map(Value::Text),
        Header::Array(len) => {
            let mut items = Vec::with_capacity(len.map_or(0, |n| n.min(PREALLOC_LIMIT)));
            match len {
                Some(n) => {
                    for _ in 0..n {
                        items.push(read_value(decoder, depth - 1)?);
                    }
                }
                None => {
                    while !at_break(decoder)? {
                        items.push(read_value(decoder, depth - 1)?);
                    }
                }
            }
            Ok(Value::Array(items))
        }
        Header::Map(len) => {
            let mut entries = Vec::with_capacity(len.map_or(0, |n| n.min(PREALLOC_LIMIT)));
            match len {
                Some(n) => {
                    for _ in 0..n {
                        let k = read_value(decoder, depth - 1)?;
                        let v = read_value(decoder, depth - 1)?;
                        entries.push((k, v));
                    }
                }
                None => {
                    while !at_break(decoder)? {
                        let k = read_value(decoder, depth - 1)?;
                        let v = read_value(decoder, depth - 1)?;
                        entries.push((k, v));
                    }
                }
            }
            Ok(Value::Map(entries))
        }
        Header::Tag(number) => {
            let inner = read_value(decoder, depth - 1)?;
            Ok(fold_bignum(number, inner))
        }
    }
}

/// Consume a `break` if one is next; otherwise leave the header in place.
fn at_break(decoder: &mut SliceDecoder<'_>) -> Result<bool> {
    match decoder.pull().map_err(decode_err)? {
        Header::Break => Ok(true),
        header => {
            decoder.push(header);
            Ok(false)
        }
    }
}

fn read_bytes(decoder: &mut SliceDecoder<'_>, len: Option<usize>) -> Result<Vec<u8>> {
    let mut scratch = [0u8; 4096];
    let mut out = Vec::new();
    let mut segments = decoder.bytes(len);
    while let Some(mut segment) = segments.pull().map_err(decode_err)? {
        while let Some(chunk) = segment.pull(&mut scratch).map_err(decode_err)? {
            out.extend_from_slice(chunk);
        }
    }
    Ok(out)
}

fn read_text(decoder: &mut SliceDecoder<'_>, len: Option<usize>) -> Result<String> {
    let mut scratch = [0u8; 4096];
    let mut out = String::new();
    let mut segments = decoder.text(len);
    while let Some(mut segment) = segments.pull().map_err(decode_err)? {
        while let Some(chunk) = segment.pull(&mut scratch).map_err(decode_err)? {
            out.push_str(chunk);
        }
    }
    Ok(out)
}

fn fold_bignum(number: u64, inner: Value) -> Value {
    match (number, inner) {
        (BIGPOS, Value::Bytes(raw)) => Value::Integer(BigInt::from_bytes_be(Sign::Plus, &raw)),
        (BIGNEG, Value::Bytes(raw)) => {
            Value::Integer(-(BigInt::from_bytes_be(Sign::Plus, &raw) + 1u32))
        }
        (number, inner) => Value::Tag(number, Box::new(inner)),
    }
}

fn push(encoder: &mut VecEncoder<'_>, header: Header) -> Result<()> {
    encoder.push(header).map_err(encode_err)
}

fn write_value(encoder: &mut VecEncoder<'_>, value: &Value, depth: usize) -> Result<()> {
    if depth == 0 {
        return Err(BridgeError::BackendEncode(format!(
            "nesting deeper than {MAX_NESTING} levels"
        )));
    }
    match value {
        Value::Null => push(encoder, Header::Simple(simple::NULL)),
        Value::Bool(b) => push(
            encoder,
            Header::Simple(if *b { simple::TRUE } else { simple::FALSE }),
        ),
        Value::Integer(n) => write_integer(encoder, n),
        Value::Float(f) => push(encoder, Header::Float(*f)),
        Value::Bytes(bytes) => encoder.bytes(bytes, None).map_err(encode_err),
        Value::Text(s) => encoder.text(s, None).map_err(encode_err),
        Value::Array(items) => {
            push(encoder, Header::Array(Some(items.len())))?;
            items
                .iter()
                .try_for_each(|item| write_value(encoder, item, depth - 1))
        }
        Value::Map(entries) => {
            push(encoder, Header::Map(Some(entries.len())))?;
            entries.iter().try_for_each(|(k, v)| {
                write_value(encoder, k, depth - 1)?;
                write_value(encoder, v, depth - 1)
            })
        }
        Value::Tag(number, inner) => {
            push(encoder, Header::Tag(*number))?;
            write_value(encoder, inner, depth - 1)
        }
        Value::Undefined => push(encoder, Header::Simple(simple::UNDEFINED)),
    }
}

fn write_integer(encoder: &mut VecEncoder<'_>, n: &BigInt) -> Result<()> {
    if n.sign() == Sign::Minus {
        // major type 1 carries -1 - n
        let m = -(n + 1u32);
        if let Ok(small) = u64::try_from(&m) {
            return push(encoder, Header::Negative(small));
        }
        push(encoder, Header::Tag(BIGNEG))?;
        encoder
            .bytes(&m.magnitude().to_bytes_be(), None)
            .map_err(encode_err)
    } else {
        if let Ok(small) = u64::try_from(n) {
            return push(encoder, Header::Positive(small));
        }
        push(encoder, Header::Tag(BIGPOS))?;
        encoder
            .bytes(&n.magnitude().to_bytes_be(), None)
            .map_err(encode_err)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn decode_hex(s: &str) -> Result<Value> {
        CiboriumBackend.decode(&hex::decode(s).unwrap())
    }

    fn encode_hex(v: &Value) -> String {
        hex::encode(CiboriumBackend.encode(v).expect("encode"))
    }

    #[test]
    fn decodes_rfc8949_appendix_a_scalars() {
        assert_eq!(decode_hex("00").unwrap(), Value::from(0_i64));
        assert_eq!(decode_hex("1903e8").unwrap(), Value::from(1000_i64));
        assert_eq!(decode_hex("3863").unwrap(), Value::from(-100_i64));
        assert_eq!(
            decode_hex("3bffffffffffffffff").unwrap(),
            Value::Integer(-BigInt::from(u64::MAX) - 1u32)
        );
        assert_eq!(decode_hex("f93e00").unwrap(), Value::Float(1.5));
        assert_eq!(decode_hex("f97c00").unwrap(), Value::Float(f64::INFINITY));
        assert_eq!(decode_hex("f4").unwrap(), Value::Bool(false));
        assert_eq!(decode_hex("f6").unwrap(), Value::Null);
        assert_eq!(decode_hex("f7").unwrap(), Value::Undefined);
        assert_eq!(decode_hex("6449455446").unwrap(), Value::from("IETF"));
        assert_eq!(decode_hex("4401020304").unwrap(), Value::Bytes(vec![1, 2, 3, 4]));
    }

    #[test]
    fn folds_bignum_tags_into_integers() {
        // 18446744073709551616 = 2^64
        let v = decode_hex("c249010000000000000000").unwrap();
        assert_eq!(v, Value::Integer(BigInt::from(u64::MAX) + 1u32));
        // -18446744073709551617 = -2^64 - 1
        let v = decode_hex("c349010000000000000000").unwrap();
        assert_eq!(v, Value::Integer(-(BigInt::from(u64::MAX) + 2u32)));
        // tag 2 over text is not a bignum
        assert_eq!(decode_hex("c26161").unwrap(), Value::tagged(2, Value::from("a")));
    }

    #[test]
    fn accepts_indefinite_lengths() {
        let v = decode_hex("5f42010243030405ff").unwrap();
        assert_eq!(v, Value::Bytes(vec![1, 2, 3, 4, 5]));
        let v = decode_hex("7f657374726561646d696e67ff").unwrap();
        assert_eq!(v, Value::from("streaming"));
        let v = decode_hex("9f018202039f0405ffff").unwrap();
        assert_eq!(
            v,
            Value::Array(vec![
                Value::from(1_i64),
                Value::Array(vec![Value::from(2_i64), Value::from(3_i64)]),
                Value::Array(vec![Value::from(4_i64), Value::from(5_i64)]),
            ])
        );
        let v = decode_hex("bf61610161629f0203ffff").unwrap();
        assert_eq!(
            v,
            Value::Map(vec![
                (Value::from("a"), Value::from(1_i64)),
                (Value::from("b"), Value::Array(vec![Value::from(2_i64), Value::from(3_i64)])),
            ])
        );
    }

    #[test]
    fn keeps_map_wire_order_and_non_text_keys() {
        let v = decode_hex("a3016161f5616243010203f6").unwrap();
        assert_eq!(
            v,
            Value::Map(vec![
                (Value::from(1_i64), Value::from("a")),
                (Value::Bool(true), Value::from("b")),
                (Value::Bytes(vec![1, 2, 3]), Value::Null),
            ])
        );
    }

    #[test]
    fn rejects_malformed_input() {
        for input in ["", "ff", "18", "5f01ff", "0000", "62c328", "f0", "1c"] {
            let err = decode_hex(input).unwrap_err();
            assert!(matches!(err, BridgeError::BackendDecode(_)), "{input}: {err:?}");
        }
    }

    #[test]
    fn rejects_excessive_nesting() {
        let deep = "81".repeat(MAX_NESTING + 1) + "00";
        let err = decode_hex(&deep).unwrap_err();
        assert!(err.to_string().contains("nesting"), "{err}");
    }

    #[test]
    fn encodes_preferred_serialization() {
        assert_eq!(encode_hex(&Value::from(0_i64)), "00");
        assert_eq!(encode_hex(&Value::from(500_i64)), "1901f4");
        assert_eq!(encode_hex(&Value::from(-1_i64)), "20");
        assert_eq!(encode_hex(&Value::Float(1.5)), "f93e00");
        assert_eq!(encode_hex(&Value::Float(100_000.0)), "fa47c35000");
        assert_eq!(encode_hex(&Value::Float(1.1)), "fb3ff199999999999a");
        assert_eq!(encode_hex(&Value::Bytes(vec![1, 2])), "420102");
        assert_eq!(encode_hex(&Value::Undefined), "f7");
        assert_eq!(encode_hex(&Value::tagged(1, Value::from(0_i64))), "c100");
    }

    #[test]
    fn encodes_bignums_beyond_major_type_range() {
        let two_pow_64 = Value::Integer(BigInt::from(u64::MAX) + 1u32);
        assert_eq!(encode_hex(&two_pow_64), "c249010000000000000000");
        let lowest_native = Value::Integer(-BigInt::from(u64::MAX) - 1u32);
        assert_eq!(encode_hex(&lowest_native), "3bffffffffffffffff");
        let below = Value::Integer(-BigInt::from(u64::MAX) - 2u32);
        assert_eq!(encode_hex(&below), "c349010000000000000000");
    }

    #[test]
    fn encode_then_decode_is_identity() {
        let v = Value::Map(vec![
            (Value::from("k"), Value::Array(vec![Value::Undefined, Value::Float(-0.5)])),
            (Value::from(-7_i64), Value::tagged(32, Value::from("https://example.com"))),
        ]);
        let bytes = CiboriumBackend.encode(&v).unwrap();
        assert_eq!(CiboriumBackend.decode(&bytes).unwrap(), v);
    }
}
