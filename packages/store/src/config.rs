//! # Client configuration — `gameshelf.toml` and environment
//!
//! Defines where the backend lives and how the bearer token is stored.
//! Configuration can come from a TOML file (filename:
//! [`ClientConfig::filename`] = `"gameshelf.toml"`) or from the environment
//! (optionally seeded from a `.env` file).
//!
//! ## Structure
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:3000"
//!
//! [storage]
//! token_key = "token"          # key the bearer token is stored under
//! data_dir = "/tmp/gameshelf"  # optional, desktop/mobile only
//! ```
//!
//! ## Environment
//!
//! | Variable | Required | Maps to |
//! |----------|----------|---------|
//! | `BACKEND_SERVER_URL` | yes | `api.base_url` |
//! | `TOKEN_STORAGE_KEY` | no | `storage.token_key` |
//!
//! A missing `[storage]` section is equivalent to its defaults. Trailing
//! slashes on the base URL are stripped so paths can be joined with `/`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::credentials::{SharedCredentials, DEFAULT_TOKEN_KEY};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    MissingVar(&'static str),
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Top-level configuration stored in `gameshelf.toml`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Backend connection settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every resource path is joined onto, without trailing slash.
    pub base_url: String,
}

/// Credential storage settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_token_key")]
    pub token_key: String,
    /// Overrides the platform data directory used by the file backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

fn default_token_key() -> String {
    DEFAULT_TOKEN_KEY.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            token_key: default_token_key(),
            data_dir: None,
        }
    }
}

impl ClientConfig {
    /// Create a config pointing at `base_url` with default storage settings.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            api: ApiConfig {
                base_url: normalize_base_url(&base_url.into()),
            },
            storage: StorageConfig::default(),
        }
    }

    /// Builder method to override the token storage key.
    pub fn with_token_key(mut self, key: impl Into<String>) -> Self {
        self.storage.token_key = key.into();
        self
    }

    /// The well-known filename for the config file.
    pub fn filename() -> &'static str {
        "gameshelf.toml"
    }

    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let base_url = std::env::var("BACKEND_SERVER_URL")
            .map_err(|_| ConfigError::MissingVar("BACKEND_SERVER_URL"))?;
        let mut config = Self::new(base_url);
        if let Ok(key) = std::env::var("TOKEN_STORAGE_KEY") {
            if !key.trim().is_empty() {
                config.storage.token_key = key;
            }
        }
        Ok(config)
    }

    /// Parse from TOML string.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(s)?;
        config.api.base_url = normalize_base_url(&config.api.base_url);
        Ok(config)
    }

    /// Serialize to TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Open the platform-appropriate credential store for this config.
    ///
    /// - **Web** (WASM + `web` feature): browser localStorage
    /// - **Desktop / Mobile** (native): a token file in the data directory
    /// - **WASM without `web`**: in-memory only
    pub fn open_credentials(&self) -> SharedCredentials {
        let key = self.storage.token_key.clone();
        #[cfg(all(target_arch = "wasm32", feature = "web"))]
        {
            std::sync::Arc::new(crate::LocalStorageStore::with_key(key))
        }
        #[cfg(all(target_arch = "wasm32", not(feature = "web")))]
        {
            std::sync::Arc::new(crate::MemoryStore::with_key(key))
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            let store = match &self.storage.data_dir {
                Some(dir) => crate::FileStore::new(dir.clone(), key),
                None => crate::FileStore::in_data_dir(key),
            };
            std::sync::Arc::new(store)
        }
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_section_defaults() {
        let config = ClientConfig::from_toml(
            r#"
            [api]
            base_url = "http://localhost:3000/"
            "#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "http://localhost:3000");
        assert_eq!(config.storage.token_key, "token");
        assert!(config.storage.data_dir.is_none());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = ClientConfig::new("https://api.example.com//").with_token_key("gs-token");
        let text = config.to_toml().unwrap();
        let loaded = ClientConfig::from_toml(&text).unwrap();

        assert_eq!(loaded, config);
        assert_eq!(loaded.api.base_url, "https://api.example.com");
    }

    #[test]
    fn test_missing_api_section_is_an_error() {
        let err = ClientConfig::from_toml("[storage]\ntoken_key = \"t\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_open_credentials_uses_data_dir_override() {
        let dir = std::env::temp_dir().join(format!("gameshelf_cfg_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);

        let mut config = ClientConfig::new("http://localhost:3000").with_token_key("session");
        config.storage.data_dir = Some(dir.clone());

        let store = config.open_credentials();
        store.save("tok").unwrap();
        assert_eq!(std::fs::read_to_string(dir.join("session")).unwrap(), "tok");

        // A second handle sees the same token, as after an app restart
        assert_eq!(config.open_credentials().load().as_deref(), Some("tok"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
