//! Key-value storage layer for posvault
//!
//! Every record category of the point-of-sale system lives under one string key
//! as a serialized JSON document. The backup core only relies on the
//! `KeyValueStore` contract: synchronous reads and writes, deletes, key
//! enumeration and an advisory capacity.

pub mod file_io;
pub mod file_store;
pub mod memory;

pub use file_store::FileStore;
pub use memory::MemoryStore;

use crate::error::VaultResult;

/// A persistent, synchronous, string-keyed store of string values
pub trait KeyValueStore {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> VaultResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&mut self, key: &str, value: &str) -> VaultResult<()>;

    /// Remove `key`; removing a missing key is not an error
    fn delete(&mut self, key: &str) -> VaultResult<()>;

    /// All keys currently present
    fn keys(&self) -> VaultResult<Vec<String>>;

    /// Approximate capacity in bytes, if the backend has one
    fn capacity_hint(&self) -> Option<u64> {
        None
    }

    /// Approximate bytes used by all keys and values
    fn usage_bytes(&self) -> VaultResult<u64> {
        let mut total = 0u64;
        for key in self.keys()? {
            let value_len = self.get(&key)?.map_or(0, |v| v.len());
            total += (key.len() + value_len) as u64;
        }
        Ok(total)
    }
}
