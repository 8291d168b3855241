//! Backup restoration for posvault
//!
//! Restoring overwrites every domain key present in the snapshot and leaves
//! all other keys alone. Anything that cached store contents before the
//! restore is stale afterwards; reloading it is the caller's job.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{VaultError, VaultResult};
use crate::storage::KeyValueStore;

use super::catalog::BackupCatalog;
use super::snapshot::{Domains, SnapshotDocument};

/// Applies catalog entries back onto the store
pub struct RestoreExecutor;

impl RestoreExecutor {
    /// Restore the snapshot behind catalog entry `entry_id`
    pub fn restore<S: KeyValueStore + ?Sized>(
        catalog: &BackupCatalog,
        store: &mut S,
        entry_id: &str,
    ) -> VaultResult<RestoreReport> {
        let prepared = Self::prepare(catalog, &*store, entry_id)?;
        Self::apply(store, prepared)
    }

    /// Load and decode the snapshot behind `entry_id` without touching the store
    ///
    /// Fails with `NotFound` for unknown or failed entries and `CorruptPayload`
    /// when the payload is missing or unreadable.
    pub fn prepare<S: KeyValueStore + ?Sized>(
        catalog: &BackupCatalog,
        store: &S,
        entry_id: &str,
    ) -> VaultResult<PreparedRestore> {
        let entry = catalog
            .find_by_id(entry_id)
            .filter(|e| e.is_succeeded())
            .ok_or_else(|| VaultError::backup_not_found(entry_id))?;

        let storage_key = entry
            .storage_key
            .as_deref()
            .ok_or_else(|| VaultError::backup_not_found(entry_id))?;

        let document = load_document(store, storage_key)?;
        let domains = document.decoded_domains()?;

        Ok(PreparedRestore {
            entry_id: entry_id.to_string(),
            backup_date: document.created_at,
            schema_version: document.schema_version,
            domains,
        })
    }

    /// Write a prepared snapshot back into the store
    pub fn apply<S: KeyValueStore + ?Sized>(
        store: &mut S,
        prepared: PreparedRestore,
    ) -> VaultResult<RestoreReport> {
        let restored_keys = apply_domains(store, &prepared.domains)?;

        tracing::info!(id = %prepared.entry_id, keys = restored_keys.len(), "Restored backup");

        Ok(RestoreReport {
            entry_id: prepared.entry_id,
            backup_date: prepared.backup_date,
            schema_version: prepared.schema_version,
            restored_keys,
        })
    }
}

/// A decoded snapshot held in memory, ready to be applied
///
/// Holding the domains means the restore no longer depends on the payload
/// key, so the catalog may change between `prepare` and `apply`.
#[derive(Debug, Clone)]
pub struct PreparedRestore {
    pub entry_id: String,
    pub backup_date: DateTime<Utc>,
    pub schema_version: String,
    pub domains: Domains,
}

/// Read and parse a stored snapshot
pub fn load_document<S: KeyValueStore + ?Sized>(
    store: &S,
    storage_key: &str,
) -> VaultResult<SnapshotDocument> {
    let contents = store.get(storage_key)?.ok_or_else(|| {
        VaultError::CorruptPayload(format!("Payload '{}' is missing from the store", storage_key))
    })?;

    serde_json::from_str(&contents).map_err(|e| {
        VaultError::CorruptPayload(format!("Payload '{}' cannot be parsed: {}", storage_key, e))
    })
}

/// Write each domain value back under its key
///
/// Collections are serialized; text values are written as-is.
fn apply_domains<S: KeyValueStore + ?Sized>(
    store: &mut S,
    domains: &Domains,
) -> VaultResult<Vec<String>> {
    let mut restored = Vec::with_capacity(domains.len());

    for (key, value) in domains {
        let raw = match value {
            Value::String(text) => text.clone(),
            other => serde_json::to_string(other)?,
        };
        store.set(key, &raw)?;
        restored.push(key.clone());
    }

    Ok(restored)
}

/// Result of a restore operation
#[derive(Debug)]
pub struct RestoreReport {
    /// Catalog entry that was restored
    pub entry_id: String,
    /// When the restored snapshot was captured
    pub backup_date: DateTime<Utc>,
    /// Schema version of the restored snapshot
    pub schema_version: String,
    /// Store keys that were overwritten
    pub restored_keys: Vec<String>,
}

impl RestoreReport {
    /// Get a summary of what was restored
    pub fn summary(&self) -> String {
        if self.restored_keys.is_empty() {
            "Restored: nothing".to_string()
        } else {
            format!("Restored: {}", self.restored_keys.join(", "))
        }
    }
}
