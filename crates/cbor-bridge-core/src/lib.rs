// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Core of the CBOR cross-implementation conformance bridge.
//!
//! A bridge wraps one CBOR library and exposes two operations over a uniform
//! JSON envelope so a harness can diff many libraries against each other:
//!
//! - `decode(hex)`: hex → bytes → native [`Value`] → JSON-safe JSON.
//! - `encode(json)`: JSON-safe JSON → native [`Value`] → bytes → hex.
//!
//! JSON cannot carry byte strings, non-finite floats, tags, `undefined`,
//! integers beyond 2^53 or non-text map keys, so [`translate`] defines a
//! reversible marker encoding for them. [`CodecService`] does the
//! orchestration and never fails: every error is reported inside an
//! [`Envelope`].
//!
//! Transports (HTTP, stdio) live in their own crates and only speak
//! [`Envelope`].

pub mod backend;
pub mod error;
pub mod service;
pub mod translate;
pub mod value;

pub use backend::{BackendInfo, CborBackend, CiboriumBackend, MAX_NESTING};
pub use error::{BridgeError, Result};
pub use service::{CodecService, Envelope};
pub use translate::{from_json_safe, round_trip_eq, to_json_safe, MAX_SAFE_INTEGER};
pub use value::Value;

// Pulled in for its `std::io` blanket impls, which `ciborium-ll` reads and
// writes through.
use ciborium_io as _;
