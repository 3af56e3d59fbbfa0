// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error taxonomy shared by the translator, the backend and the codec service.

use thiserror::Error;

/// Everything that can go wrong while servicing one decode/encode request.
///
/// The `Display` text is what ends up in the `error` field of a failure
/// envelope, so every variant carries a stable category prefix.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BridgeError {
    /// Hex input was malformed (odd length or a non-hex digit) before any CBOR
    /// decoding was attempted.
    #[error("invalid hex: {0}")]
    InputFormat(String),
    /// The CBOR backend rejected the bytes.
    #[error("cbor decode error: {0}")]
    BackendDecode(String),
    /// The CBOR backend could not encode the native value.
    #[error("cbor encode error: {0}")]
    BackendEncode(String),
    /// A JSON-safe marker object carried an invalid payload.
    #[error("malformed marker: {0}")]
    MalformedMarker(String),
}

impl From<hex::FromHexError> for BridgeError {
    fn from(err: hex::FromHexError) -> Self {
        Self::InputFormat(err.to_string())
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_category_prefix() {
        let err = BridgeError::MalformedMarker("bad float literal \"nan\"".into());
        assert_eq!(err.to_string(), "malformed marker: bad float literal \"nan\"");

        let err = BridgeError::from(hex::FromHexError::OddLength);
        assert!(err.to_string().starts_with("invalid hex: "));
    }
}
