// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Saved preferences for the HTTP bridge.

use serde::{Deserialize, Serialize};

/// Config key the HTTP bridge prefs live under.
pub const HTTP_BRIDGE_KEY: &str = "http_bridge";

/// Default listen address, matching the harness container convention.
pub const DEFAULT_LISTEN: &str = "0.0.0.0:8080";

/// Persisted HTTP bridge settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpBridgePrefs {
    /// Socket address to bind (`host:port`).
    pub listen: String,
}

impl Default for HttpBridgePrefs {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_owned(),
        }
    }
}
