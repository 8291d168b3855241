//! In-memory key-value store
//!
//! Mirrors a browser-style storage area: an ordered map with an optional quota
//! that rejects writes pushing usage past it.

use std::collections::BTreeMap;

use crate::error::{VaultError, VaultResult};

use super::KeyValueStore;

/// Ordered in-memory store with an optional byte quota
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
    quota_bytes: Option<u64>,
}

impl MemoryStore {
    /// Create an unbounded store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that rejects writes once usage would exceed `quota_bytes`
    pub fn with_quota(quota_bytes: u64) -> Self {
        Self {
            entries: BTreeMap::new(),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Number of keys present
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no keys
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn used(&self) -> u64 {
        self.entries
            .iter()
            .map(|(k, v)| (k.len() + v.len()) as u64)
            .sum()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> VaultResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> VaultResult<()> {
        if let Some(quota) = self.quota_bytes {
            let replaced = self
                .entries
                .get(key)
                .map_or(0, |old| (key.len() + old.len()) as u64);
            let projected = self.used() - replaced + (key.len() + value.len()) as u64;
            if projected > quota {
                return Err(VaultError::StorageWriteFailure(format!(
                    "Quota exceeded writing '{}': {} of {} bytes",
                    key, projected, quota
                )));
            }
        }

        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> VaultResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> VaultResult<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }

    fn capacity_hint(&self) -> Option<u64> {
        self.quota_bytes
    }

    fn usage_bytes(&self) -> VaultResult<u64> {
        Ok(self.used())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_delete() {
        let mut store = MemoryStore::new();
        store.set("customers", "[]").unwrap();
        assert_eq!(store.get("customers").unwrap().as_deref(), Some("[]"));

        store.delete("customers").unwrap();
        assert!(store.get("customers").unwrap().is_none());

        // Deleting again is fine
        store.delete("customers").unwrap();
    }

    #[test]
    fn test_keys_sorted() {
        let mut store = MemoryStore::new();
        store.set("sales", "[]").unwrap();
        store.set("inventory", "[]").unwrap();

        assert_eq!(store.keys().unwrap(), vec!["inventory", "sales"]);
    }

    #[test]
    fn test_quota_rejects_write() {
        let mut store = MemoryStore::with_quota(20);
        store.set("sales", "[1,2,3]").unwrap();

        let err = store.set("customers", "[\"a long customer list\"]").unwrap_err();
        assert!(matches!(err, VaultError::StorageWriteFailure(_)));
        assert!(store.get("customers").unwrap().is_none());
        assert_eq!(store.capacity_hint(), Some(20));
    }

    #[test]
    fn test_quota_counts_replacement() {
        let mut store = MemoryStore::with_quota(12);
        store.set("sales", "1234567").unwrap();
        // Replacing the value frees the old bytes first
        store.set("sales", "7654321").unwrap();
        assert_eq!(store.usage_bytes().unwrap(), 12);
    }
}
