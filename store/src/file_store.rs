//! # Filesystem-backed key-value store
//!
//! [`FileStore`] is a [`KvStore`] implementation that persists each key to
//! its own file under a base directory. It is what makes identity pointers
//! and pending-auth scalars survive process restarts on desktop platforms.
//!
//! ## Platform data directories
//!
//! [`FileStore::default_base`] uses [`dirs::data_dir()`]:
//!
//! | Platform | Path |
//! |----------|------|
//! | macOS | `~/Library/Application Support/choresync/` |
//! | Linux | `~/.local/share/choresync/` |
//! | Windows | `C:\Users\<user>\AppData\Roaming\choresync\` |

use std::path::PathBuf;

use crate::error::StoreError;
use crate::kv::KvStore;

/// Filesystem-backed KvStore, one file per key.
#[derive(Clone, Debug)]
pub struct FileStore {
    base: PathBuf,
}

impl FileStore {
    pub fn new(base: PathBuf) -> Self {
        Self { base }
    }

    /// Platform data directory for the app, falling back to the temp dir.
    pub fn default_base() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("choresync")
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.base.join(key)
    }
}

impl KvStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(self.key_path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.base)?;
        std::fs::write(self.key_path(key), value)?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let dir = std::env::temp_dir().join(format!("choresync_test_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);

        let store = FileStore::new(dir.clone());
        store.set("pending_email", "sam@example.com").await.unwrap();

        // Re-open from the same directory
        let store2 = FileStore::new(dir.clone());
        assert_eq!(
            store2.get("pending_email").await.unwrap().as_deref(),
            Some("sam@example.com")
        );

        store2.remove("pending_email").await.unwrap();
        assert!(store2.get("pending_email").await.unwrap().is_none());

        // Removing a missing key is not an error
        store2.remove("pending_email").await.unwrap();

        let _ = std::fs::remove_dir_all(&dir);
    }
}
