// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! One-request orchestration: hex/JSON in, uniform envelope out.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use serde::de::Error as DeError;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use crate::backend::{BackendInfo, CborBackend, CiboriumBackend};
use crate::error::{BridgeError, Result};
use crate::translate::{from_json_safe, to_json_safe};

/// Result of a single decode or encode request.
///
/// Serializes to exactly one of:
///
/// - `{"success": true, "result": <json-safe>, "duration_ms": <number>}`
/// - `{"success": true, "hex": "<lowercase hex>", "duration_ms": <number>}`
/// - `{"success": false, "error": "<message>"}`
#[derive(Clone, Debug, PartialEq)]
pub enum Envelope {
    /// Successful decode.
    Decoded {
        /// JSON-safe rendering of the decoded item.
        result: JsonValue,
        /// Time spent in the backend decode plus translation.
        duration_ms: f64,
    },
    /// Successful encode.
    Encoded {
        /// Lowercase hex of the encoded bytes.
        hex: String,
        /// Time spent in translation plus the backend encode.
        duration_ms: f64,
    },
    /// Any failure, in either direction.
    Failed {
        /// Human readable message with a category prefix.
        error: String,
    },
}

impl Envelope {
    /// Build a failure envelope from an error.
    pub fn failed(err: &BridgeError) -> Self {
        Self::Failed {
            error: err.to_string(),
        }
    }

    /// `true` for `Decoded`/`Encoded`.
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Elapsed time for successful envelopes.
    pub fn duration_ms(&self) -> Option<f64> {
        match self {
            Self::Decoded { duration_ms, .. } | Self::Encoded { duration_ms, .. } => {
                Some(*duration_ms)
            }
            Self::Failed { .. } => None,
        }
    }

    /// The envelope as a JSON object, keys in wire order.
    pub fn to_json(&self) -> JsonValue {
        let mut obj = Map::with_capacity(3);
        obj.insert("success".into(), JsonValue::Bool(self.is_success()));
        match self {
            Self::Decoded {
                result,
                duration_ms,
            } => {
                obj.insert("result".into(), result.clone());
                obj.insert("duration_ms".into(), JsonValue::from(*duration_ms));
            }
            Self::Encoded { hex, duration_ms } => {
                obj.insert("hex".into(), JsonValue::String(hex.clone()));
                obj.insert("duration_ms".into(), JsonValue::from(*duration_ms));
            }
            Self::Failed { error } => {
                obj.insert("error".into(), JsonValue::String(error.clone()));
            }
        }
        JsonValue::Object(obj)
    }
}

impl Serialize for Envelope {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Decoded {
                result,
                duration_ms,
            } => {
                let mut m = serializer.serialize_map(Some(3))?;
                m.serialize_entry("success", &true)?;
                m.serialize_entry("result", result)?;
                m.serialize_entry("duration_ms", duration_ms)?;
                m.end()
            }
            Self::Encoded { hex, duration_ms } => {
                let mut m = serializer.serialize_map(Some(3))?;
                m.serialize_entry("success", &true)?;
                m.serialize_entry("hex", hex)?;
                m.serialize_entry("duration_ms", duration_ms)?;
                m.end()
            }
            Self::Failed { error } => {
                let mut m = serializer.serialize_map(Some(2))?;
                m.serialize_entry("success", &false)?;
                m.serialize_entry("error", error)?;
                m.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Envelope {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Map::<String, JsonValue>::deserialize(deserializer)?;
        Self::try_from(raw).map_err(D::Error::custom)
    }
}

impl TryFrom<Map<String, JsonValue>> for Envelope {
    type Error = String;

    fn try_from(mut raw: Map<String, JsonValue>) -> std::result::Result<Self, Self::Error> {
        let success = raw
            .get("success")
            .and_then(JsonValue::as_bool)
            .ok_or("missing boolean \"success\"")?;
        if !success {
            let error = match raw.remove("error") {
                Some(JsonValue::String(error)) => error,
                _ => return Err("failure envelope without string \"error\"".into()),
            };
            return Ok(Self::Failed { error });
        }
        let duration_ms = raw
            .get("duration_ms")
            .and_then(JsonValue::as_f64)
            .ok_or("missing numeric \"duration_ms\"")?;
        if let Some(result) = raw.remove("result") {
            return Ok(Self::Decoded {
                result,
                duration_ms,
            });
        }
        match raw.remove("hex") {
            Some(JsonValue::String(hex)) => Ok(Self::Encoded { hex, duration_ms }),
            _ => Err("success envelope without \"result\" or string \"hex\"".into()),
        }
    }
}

/// Stateless decode/encode orchestrator around an injected [`CborBackend`].
///
/// Every call is independent; share one instance across threads behind an
/// `Arc` when the backend is `Sync`.
#[derive(Clone, Debug)]
pub struct CodecService<B = CiboriumBackend> {
    backend: B,
}

impl Default for CodecService<CiboriumBackend> {
    fn default() -> Self {
        Self::new(CiboriumBackend)
    }
}

impl<B: CborBackend> CodecService<B> {
    /// Create a service driving `backend`.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Identity of the underlying backend.
    pub fn info(&self) -> BackendInfo {
        self.backend.info()
    }

    /// Decode a hex string of CBOR bytes into a JSON-safe envelope.
    pub fn decode(&self, hex_input: &str) -> Envelope {
        match self.try_decode(hex_input) {
            Ok((result, kind, duration_ms)) => {
                debug!(kind, duration_ms, input_len = hex_input.len(), "decode ok");
                Envelope::Decoded {
                    result,
                    duration_ms,
                }
            }
            Err(err) => {
                debug!(%err, input_len = hex_input.len(), "decode failed");
                Envelope::failed(&err)
            }
        }
    }

    /// Encode a JSON-safe value into CBOR, reported as lowercase hex.
    pub fn encode(&self, input: JsonValue) -> Envelope {
        match self.try_encode(input) {
            Ok((hex, kind, duration_ms)) => {
                debug!(kind, duration_ms, output_len = hex.len(), "encode ok");
                Envelope::Encoded { hex, duration_ms }
            }
            Err(err) => {
                debug!(%err, "encode failed");
                Envelope::failed(&err)
            }
        }
    }

    /// Returns the JSON-safe result, the top-level item kind and the elapsed time.
    fn try_decode(&self, hex_input: &str) -> Result<(JsonValue, &'static str, f64)> {
        let bytes = hex::decode(hex_input)?;
        let start = Instant::now();
        let native = guarded(|| self.backend.decode(&bytes), BridgeError::BackendDecode)?;
        let result = to_json_safe(&native);
        Ok((result, native.kind(), elapsed_ms(start)))
    }

    fn try_encode(&self, input: JsonValue) -> Result<(String, &'static str, f64)> {
        let start = Instant::now();
        let native = from_json_safe(input)?;
        let bytes = guarded(|| self.backend.encode(&native), BridgeError::BackendEncode)?;
        Ok((hex::encode(bytes), native.kind(), elapsed_ms(start)))
    }
}

/// Run a backend call, turning a panic into the given error kind.
fn guarded<T>(call: impl FnOnce() -> Result<T>, kind: fn(String) -> BridgeError) -> Result<T> {
    catch_unwind(AssertUnwindSafe(call)).unwrap_or_else(|payload| {
        let msg = payload
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_owned());
        Err(kind(format!("backend panicked: {msg}")))
    })
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
