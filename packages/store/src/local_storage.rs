//! # Browser localStorage credential store
//!
//! [`LocalStorageStore`] is the [`CredentialStore`] used on the **web
//! platform**. The token lives in `window.localStorage` under the configured
//! key, so it persists across page reloads in one browser profile and nowhere
//! else.
//!
//! A failed write (storage disabled, quota exceeded, private mode) is
//! returned as a [`StoreError`]. A failed read is "no token", which the
//! session layer already treats as signed out.

use crate::credentials::{CredentialStore, StoreError, DEFAULT_TOKEN_KEY};

/// localStorage-backed CredentialStore for the web platform.
#[derive(Clone, Debug)]
pub struct LocalStorageStore {
    key: String,
}

impl Default for LocalStorageStore {
    fn default() -> Self {
        Self::with_key(DEFAULT_TOKEN_KEY)
    }
}

impl LocalStorageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok()?
    }
}

impl CredentialStore for LocalStorageStore {
    fn save(&self, token: &str) -> Result<(), StoreError> {
        let Some(storage) = Self::storage() else {
            tracing::warn!("localStorage unavailable; token not persisted");
            return Err(StoreError::Unavailable);
        };
        storage.set_item(&self.key, token).map_err(|e| {
            tracing::warn!("Failed to write token to localStorage: {:?}", e);
            StoreError::Write(format!("{:?}", e))
        })
    }

    fn load(&self) -> Option<String> {
        Self::storage()?.get_item(&self.key).ok()?
    }

    fn clear(&self) {
        if let Some(storage) = Self::storage() {
            let _ = storage.remove_item(&self.key);
        }
    }
}
