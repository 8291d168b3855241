//! Directory-backed key-value store
//!
//! Each key is one `<key>.kv` file inside the store directory. Writes go
//! through `write_text_atomic`, so a crash leaves either the old or the new
//! value, never a torn one.

use std::fs;
use std::path::PathBuf;

use crate::error::{VaultError, VaultResult};

use super::file_io::{read_text, remove_if_exists, write_text_atomic};
use super::KeyValueStore;

const VALUE_EXTENSION: &str = "kv";

/// Key-value store persisted as one file per key
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    capacity_bytes: Option<u64>,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`
    pub fn open(dir: PathBuf) -> VaultResult<Self> {
        fs::create_dir_all(&dir).map_err(|e| {
            VaultError::Io(format!(
                "Failed to create store directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        Ok(Self {
            dir,
            capacity_bytes: None,
        })
    }

    /// Advertise an advisory capacity; the store itself never enforces it
    pub fn with_capacity_hint(mut self, capacity_bytes: u64) -> Self {
        self.capacity_bytes = Some(capacity_bytes);
        self
    }

    /// Directory holding the value files
    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    fn path_for(&self, key: &str) -> VaultResult<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}.{}", key, VALUE_EXTENSION)))
    }
}

/// Keys become file names, so only a conservative character set is allowed
fn validate_key(key: &str) -> VaultResult<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));

    if valid {
        Ok(())
    } else {
        Err(VaultError::Validation(format!("Invalid store key: '{}'", key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> VaultResult<Option<String>> {
        read_text(self.path_for(key)?)
    }

    fn set(&mut self, key: &str, value: &str) -> VaultResult<()> {
        write_text_atomic(self.path_for(key)?, value)
    }

    fn delete(&mut self, key: &str) -> VaultResult<()> {
        remove_if_exists(self.path_for(key)?)
    }

    fn keys(&self) -> VaultResult<Vec<String>> {
        let mut keys = Vec::new();

        for entry in fs::read_dir(&self.dir)
            .map_err(|e| VaultError::Io(format!("Failed to read store directory: {}", e)))?
        {
            let entry = entry
                .map_err(|e| VaultError::Io(format!("Failed to read directory entry: {}", e)))?;

            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == VALUE_EXTENSION) {
                if let Some(stem) = path.file_stem() {
                    keys.push(stem.to_string_lossy().to_string());
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    fn capacity_hint(&self) -> Option<u64> {
        self.capacity_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (FileStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path().join("store")).unwrap();
        (store, temp_dir)
    }

    #[test]
    fn test_round_trip_value() {
        let (mut store, _temp) = create_test_store();

        store.set("inventory", r#"{"sku-1":4}"#).unwrap();
        assert_eq!(
            store.get("inventory").unwrap().as_deref(),
            Some(r#"{"sku-1":4}"#)
        );
        assert!(store.get("sales").unwrap().is_none());
    }

    #[test]
    fn test_keys_lists_only_values() {
        let (mut store, _temp) = create_test_store();

        store.set("sales", "[]").unwrap();
        store.set("backup_1700000000000", "{}").unwrap();
        fs::write(store.dir().join("notes.txt"), "ignored").unwrap();

        assert_eq!(
            store.keys().unwrap(),
            vec!["backup_1700000000000", "sales"]
        );
    }

    #[test]
    fn test_delete_missing_key() {
        let (mut store, _temp) = create_test_store();
        store.delete("sales").unwrap();
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let (mut store, _temp) = create_test_store();

        assert!(store.set("../escape", "x").unwrap_err().is_validation());
        assert!(store.get("").unwrap_err().is_validation());
        assert!(store.get(".hidden").unwrap_err().is_validation());
    }

    #[test]
    fn test_usage_bytes_default() {
        let (mut store, _temp) = create_test_store();
        store.set("sales", "[1]").unwrap();

        assert_eq!(store.usage_bytes().unwrap(), 8);
        assert_eq!(store.capacity_hint(), None);
    }

    #[test]
    fn test_capacity_hint_is_advisory() {
        let (store, _temp) = create_test_store();
        let mut store = store.with_capacity_hint(4);

        // Writes past the advertised capacity still succeed
        store.set("sales", "[1,2,3]").unwrap();
        assert_eq!(store.capacity_hint(), Some(4));
        assert!(store.usage_bytes().unwrap() > 4);
    }
}
