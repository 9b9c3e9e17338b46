use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::credentials::{CredentialStore, StoreError, DEFAULT_TOKEN_KEY};

/// In-memory CredentialStore for testing and as a non-persistent fallback.
///
/// Clones share the same map, so a clone handed to a fresh session manager
/// behaves like a page reload within the same profile.
#[derive(Clone, Debug)]
pub struct MemoryStore {
    key: String,
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_key(DEFAULT_TOKEN_KEY)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that keeps its token under `key`.
    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            entries: Arc::default(),
        }
    }

    /// The storage key this store writes to.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl CredentialStore for MemoryStore {
    fn save(&self, token: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(self.key.clone(), token.to_string());
        Ok(())
    }

    fn load(&self) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&self.key)
            .cloned()
    }

    fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_clear() {
        let store = MemoryStore::new();

        // Initially empty
        assert!(store.load().is_none());

        store.save("abc.def.ghi").unwrap();
        assert_eq!(store.load().as_deref(), Some("abc.def.ghi"));

        // Saving again replaces the token
        store.save("new.token.value").unwrap();
        assert_eq!(store.load().as_deref(), Some("new.token.value"));

        store.clear();
        assert!(store.load().is_none());

        // Clearing twice is harmless
        store.clear();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_clones_share_state() {
        let store = MemoryStore::new();
        let reloaded = store.clone();

        store.save("shared").unwrap();
        assert_eq!(reloaded.load().as_deref(), Some("shared"));

        reloaded.clear();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_keys_are_isolated() {
        let a = MemoryStore::with_key("a");
        let b = MemoryStore::with_key("b");

        a.save("token-a").unwrap();
        assert!(b.load().is_none());
        assert_eq!(a.key(), "a");
    }
}
