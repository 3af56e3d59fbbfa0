// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Persisted settings for the bridge binaries.
//! Storage sits behind [`config::ConfigStore`] so binaries stay filesystem-agnostic.

pub mod config;
pub mod fs;
pub mod memory;
pub mod prefs;

pub use config::{ConfigError, ConfigService, ConfigStore};
pub use fs::FsConfigStore;
pub use memory::InMemoryConfigStore;
pub use prefs::HttpBridgePrefs;
