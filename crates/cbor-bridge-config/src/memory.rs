// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory config store for tests and ephemeral runs.

use crate::config::{ConfigError, ConfigStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory [`ConfigStore`]. Clones share state.
///
/// Tracks call counts and can be told to fail, so callers can check their
/// best-effort handling of a broken store.
#[derive(Clone, Default)]
pub struct InMemoryConfigStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    data: HashMap<String, Vec<u8>>,
    load_count: usize,
    save_count: usize,
    fail_on_load: bool,
    fail_on_save: bool,
}

impl InMemoryConfigStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_inner<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut inner)
    }

    /// Make every subsequent `load_raw` fail.
    pub fn set_fail_on_load(&self, fail: bool) {
        self.with_inner(|i| i.fail_on_load = fail);
    }

    /// Make every subsequent `save_raw` fail.
    pub fn set_fail_on_save(&self, fail: bool) {
        self.with_inner(|i| i.fail_on_save = fail);
    }

    /// Number of `load_raw` attempts, failed ones included.
    pub fn load_count(&self) -> usize {
        self.with_inner(|i| i.load_count)
    }

    /// Number of `save_raw` attempts, failed ones included.
    pub fn save_count(&self) -> usize {
        self.with_inner(|i| i.save_count)
    }

    /// Whether `key` holds a blob.
    pub fn contains_key(&self, key: &str) -> bool {
        self.with_inner(|i| i.data.contains_key(key))
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        self.with_inner(|i| {
            i.load_count += 1;
            if i.fail_on_load {
                return Err(ConfigError::Other("simulated load failure".into()));
            }
            i.data.get(key).cloned().ok_or(ConfigError::NotFound)
        })
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        self.with_inner(|i| {
            i.save_count += 1;
            if i.fail_on_save {
                return Err(ConfigError::Other("simulated save failure".into()));
            }
            i.data.insert(key.to_owned(), data.to_vec());
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_data_and_counters() {
        let a = InMemoryConfigStore::new();
        let b = a.clone();
        a.save_raw("k", b"v").unwrap();
        assert_eq!(b.load_raw("k").unwrap(), b"v");
        assert_eq!(a.load_count(), 1);
        assert_eq!(b.save_count(), 1);
    }

    #[test]
    fn failed_save_is_counted_but_not_stored() {
        let store = InMemoryConfigStore::new();
        store.set_fail_on_save(true);
        assert!(store.save_raw("k", b"v").is_err());
        assert_eq!(store.save_count(), 1);
        assert!(!store.contains_key("k"));
        store.set_fail_on_save(false);
        store.save_raw("k", b"v").unwrap();
        assert!(store.contains_key("k"));
    }
}
