//! # Filesystem-backed credential store
//!
//! [`FileStore`] is a [`CredentialStore`] implementation that persists the
//! bearer token to the local filesystem. It is used on desktop and mobile
//! platforms so a session survives app restarts.
//!
//! ## Layout
//!
//! ```text
//! <base_dir>/
//! └── <token_key>        # file containing the raw token
//! ```
//!
//! ## Platform data directories
//!
//! [`FileStore::in_data_dir`] resolves `<data_dir>/gameshelf/` via
//! [`dirs::data_dir()`]:
//!
//! | Platform | Path |
//! |----------|------|
//! | macOS / iOS | `~/Library/Application Support/gameshelf/` |
//! | Linux | `~/.local/share/gameshelf/` |
//! | Windows | `C:\Users\<user>\AppData\Roaming\gameshelf\` |
//!
//! A failed write is returned to the caller. An unreadable token file reads
//! as "signed out", and a failed removal is only logged.

use std::path::{Path, PathBuf};

use crate::credentials::{CredentialStore, StoreError};

/// Filesystem-backed CredentialStore for desktop and mobile persistence.
#[derive(Clone, Debug)]
pub struct FileStore {
    base: PathBuf,
    key: String,
}

impl FileStore {
    pub fn new(base: PathBuf, key: impl Into<String>) -> Self {
        Self {
            base,
            key: key.into(),
        }
    }

    /// Store under the platform data directory, falling back to the working
    /// directory when the platform has none.
    pub fn in_data_dir(key: impl Into<String>) -> Self {
        let base = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gameshelf");
        Self::new(base, key)
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn token_path(&self) -> PathBuf {
        self.base.join(&self.key)
    }
}

impl CredentialStore for FileStore {
    fn save(&self, token: &str) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.base).map_err(|e| {
            tracing::warn!("Failed to create credential directory {:?}: {}", self.base, e);
            StoreError::Write(e.to_string())
        })?;
        std::fs::write(self.token_path(), token).map_err(|e| {
            tracing::warn!("Failed to write credential file: {}", e);
            StoreError::Write(e.to_string())
        })
    }

    fn load(&self) -> Option<String> {
        let content = std::fs::read_to_string(self.token_path()).ok()?;
        let token = content.trim();
        if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        }
    }

    fn clear(&self) {
        match std::fs::remove_file(self.token_path()) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove credential file: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("gameshelf_{}_{}", name, std::process::id()))
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = temp_dir("reopen");
        let _ = std::fs::remove_dir_all(&dir);

        let store = FileStore::new(dir.clone(), "token");
        store.save("header.payload.signature").unwrap();

        // Re-open from same directory
        let store2 = FileStore::new(dir.clone(), "token");
        assert_eq!(store2.load().as_deref(), Some("header.payload.signature"));

        store2.clear();
        assert!(store.load().is_none());

        // Cleanup
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_clear_missing_file_is_noop() {
        let dir = temp_dir("missing");
        let _ = std::fs::remove_dir_all(&dir);

        let store = FileStore::new(dir.clone(), "token");
        store.clear();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_unwritable_directory_fails_save() {
        let dir = temp_dir("unwritable");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        // A plain file where the base directory should be
        let blocker = dir.join("blocker");
        std::fs::write(&blocker, "").unwrap();

        let store = FileStore::new(blocker, "token");
        assert!(matches!(store.save("tok"), Err(StoreError::Write(_))));
        assert!(store.load().is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_blank_file_reads_as_absent() {
        let dir = temp_dir("blank");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("token"), "  \n").unwrap();

        let store = FileStore::new(dir.clone(), "token");
        assert!(store.load().is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
