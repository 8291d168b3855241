//! Backup catalog
//!
//! The catalog is the ordered history of backup attempts, newest first. It is
//! persisted as one JSON list under `CATALOG_KEY`, separately from the snapshot
//! payloads it points at. The list write and the payload writes are separate
//! store operations: a crash between them can leave an orphaned payload or a
//! dangling reference.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{VaultError, VaultResult};
use crate::storage::KeyValueStore;

use super::retention::{self, PruneOutcome};
use super::snapshot::SnapshotDocument;

/// Store key holding the serialized catalog
pub const CATALOG_KEY: &str = "backupCatalog";

/// Prefix of the store keys holding snapshot payloads
pub const PAYLOAD_KEY_PREFIX: &str = "backup_";

/// What triggered a backup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupKind {
    Manual,
    Automatic,
    Imported,
}

impl std::fmt::Display for BackupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::Automatic => write!(f, "automatic"),
            Self::Imported => write!(f, "imported"),
        }
    }
}

/// Outcome of a backup attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Succeeded,
    Failed,
}

/// Metadata for one backup attempt
///
/// Size and encoding mirror the snapshot so listings don't need to load
/// payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub kind: BackupKind,
    pub size_bytes: u64,
    pub encoded: bool,
    pub status: EntryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl CatalogEntry {
    pub fn succeeded(
        id: String,
        storage_key: String,
        created_at: DateTime<Utc>,
        kind: BackupKind,
        size_bytes: u64,
        encoded: bool,
    ) -> Self {
        Self {
            id,
            storage_key: Some(storage_key),
            created_at,
            kind,
            size_bytes,
            encoded,
            status: EntryStatus::Succeeded,
            failure_reason: None,
        }
    }

    pub fn failed(
        id: String,
        created_at: DateTime<Utc>,
        kind: BackupKind,
        size_bytes: u64,
        encoded: bool,
        reason: String,
    ) -> Self {
        Self {
            id,
            storage_key: None,
            created_at,
            kind,
            size_bytes,
            encoded,
            status: EntryStatus::Failed,
            failure_reason: Some(reason),
        }
    }

    pub fn is_succeeded(&self) -> bool {
        self.status == EntryStatus::Succeeded
    }
}

/// Limits applied when recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogLimits {
    pub max_size_bytes: u64,
    pub retention_days: u32,
}

/// Ordered history of backup attempts
pub struct BackupCatalog {
    entries: Vec<CatalogEntry>,
    limits: CatalogLimits,
    last_id_millis: i64,
}

impl BackupCatalog {
    /// Create an empty catalog
    pub fn new(limits: CatalogLimits) -> Self {
        Self {
            entries: Vec::new(),
            limits,
            last_id_millis: 0,
        }
    }

    /// Load the persisted catalog, or start empty if none exists
    pub fn load<S: KeyValueStore + ?Sized>(store: &S, limits: CatalogLimits) -> VaultResult<Self> {
        let entries: Vec<CatalogEntry> = match store.get(CATALOG_KEY)? {
            Some(contents) => serde_json::from_str(&contents).map_err(|e| {
                VaultError::Json(format!("Failed to parse backup catalog: {}", e))
            })?,
            None => Vec::new(),
        };

        let last_id_millis = entries
            .iter()
            .filter_map(|e| e.id.parse::<i64>().ok())
            .max()
            .unwrap_or(0);

        Ok(Self {
            entries,
            limits,
            last_id_millis,
        })
    }

    /// Replace the size and retention limits
    pub fn set_limits(&mut self, limits: CatalogLimits) {
        self.limits = limits;
    }

    pub fn limits(&self) -> CatalogLimits {
        self.limits
    }

    /// All entries, newest first
    pub fn list(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Look up an entry by id
    pub fn find_by_id(&self, id: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Most recent successful entry
    pub fn latest_succeeded(&self) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.is_succeeded())
    }

    /// Store a snapshot and record the attempt
    ///
    /// On failure a failed entry is prepended instead and the error is returned
    /// so the caller can decide how to surface it.
    pub fn record<S: KeyValueStore + ?Sized>(
        &mut self,
        store: &mut S,
        document: &SnapshotDocument,
        kind: BackupKind,
        now: DateTime<Utc>,
    ) -> VaultResult<CatalogEntry> {
        let id = self.next_id(now);

        match self.try_record(store, document, kind, &id, now) {
            Ok(entry) => {
                tracing::info!(id = %entry.id, %kind, size_bytes = entry.size_bytes, "Recorded backup");
                Ok(entry)
            }
            Err(err) => {
                tracing::warn!(id = %id, %kind, error = %err, "Backup attempt failed");
                let failed = CatalogEntry::failed(
                    id,
                    now,
                    kind,
                    document.size_bytes,
                    document.encoded,
                    err.to_string(),
                );
                self.entries.insert(0, failed);
                if let Err(e) = self.persist(store) {
                    tracing::warn!(error = %e, "Failed to persist catalog after failed backup");
                }
                Err(err)
            }
        }
    }

    fn try_record<S: KeyValueStore + ?Sized>(
        &mut self,
        store: &mut S,
        document: &SnapshotDocument,
        kind: BackupKind,
        id: &str,
        now: DateTime<Utc>,
    ) -> VaultResult<CatalogEntry> {
        if document.size_bytes > self.limits.max_size_bytes {
            return Err(VaultError::SizeLimitExceeded {
                size_bytes: document.size_bytes,
                limit_bytes: self.limits.max_size_bytes,
            });
        }

        let storage_key = format!("{}{}", PAYLOAD_KEY_PREFIX, id);
        let payload = serde_json::to_string(document)?;
        store.set(&storage_key, &payload)?;

        let entry = CatalogEntry::succeeded(
            id.to_string(),
            storage_key.clone(),
            now,
            kind,
            document.size_bytes,
            document.encoded,
        );
        self.entries.insert(0, entry.clone());
        self.prune(store, now);

        if let Err(err) = self.persist(store) {
            self.entries.retain(|e| e.id != id);
            if let Err(e) = store.delete(&storage_key) {
                tracing::warn!(key = %storage_key, error = %e, "Left orphaned backup payload");
            }
            return Err(err);
        }

        Ok(entry)
    }

    /// Apply the retention window to the in-memory list
    fn prune<S: KeyValueStore + ?Sized>(
        &mut self,
        store: &mut S,
        now: DateTime<Utc>,
    ) -> Vec<CatalogEntry> {
        let entries = std::mem::take(&mut self.entries);
        let PruneOutcome { kept, removed } =
            retention::prune(entries, self.limits.retention_days, now, store);
        self.entries = kept;
        removed
    }

    /// Apply the retention window and persist the result
    pub fn enforce_retention<S: KeyValueStore + ?Sized>(
        &mut self,
        store: &mut S,
        now: DateTime<Utc>,
    ) -> VaultResult<Vec<CatalogEntry>> {
        let removed = self.prune(store, now);
        if !removed.is_empty() {
            self.persist(store)?;
        }
        Ok(removed)
    }

    /// Delete an entry and its payload; unknown ids are ignored
    pub fn remove<S: KeyValueStore + ?Sized>(&mut self, store: &mut S, id: &str) -> VaultResult<bool> {
        let Some(position) = self.entries.iter().position(|e| e.id == id) else {
            return Ok(false);
        };

        if let Some(key) = &self.entries[position].storage_key {
            store.delete(key)?;
        }
        self.entries.remove(position);
        self.persist(store)?;

        tracing::info!(id = %id, "Removed backup");
        Ok(true)
    }

    /// Write the entry list to the store
    pub fn persist<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> VaultResult<()> {
        let contents = serde_json::to_string(&self.entries)?;
        store.set(CATALOG_KEY, &contents)
    }

    /// Ids are capture epoch millis, bumped to stay increasing within a session
    fn next_id(&mut self, now: DateTime<Utc>) -> String {
        let millis = now.timestamp_millis().max(self.last_id_millis + 1);
        self.last_id_millis = millis;
        millis.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::snapshot::SnapshotBuilder;
    use crate::storage::MemoryStore;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-06-30T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn limits() -> CatalogLimits {
        CatalogLimits {
            max_size_bytes: 64 * 1024,
            retention_days: 30,
        }
    }

    fn seeded_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.set("sales", r#"[{"id":1,"total":1999}]"#).unwrap();
        store.set("customers", r#"[{"name":"Ana"}]"#).unwrap();
        store
    }

    fn snapshot(store: &MemoryStore) -> SnapshotDocument {
        SnapshotBuilder::with_defaults()
            .build(store, now(), false)
            .unwrap()
    }

    #[test]
    fn test_record_then_find() {
        let mut store = seeded_store();
        let mut catalog = BackupCatalog::new(limits());
        let document = snapshot(&store);

        let entry = catalog
            .record(&mut store, &document, BackupKind::Manual, now())
            .unwrap();

        let found = catalog.find_by_id(&entry.id).unwrap();
        assert_eq!(found.status, EntryStatus::Succeeded);
        assert_eq!(found.size_bytes, document.size_bytes);
        assert_eq!(found.id, now().timestamp_millis().to_string());

        let key = found.storage_key.as_deref().unwrap();
        let stored: SnapshotDocument =
            serde_json::from_str(&store.get(key).unwrap().unwrap()).unwrap();
        assert_eq!(stored, document);
    }

    #[test]
    fn test_record_persists_catalog() {
        let mut store = seeded_store();
        let mut catalog = BackupCatalog::new(limits());
        let document = snapshot(&store);
        catalog
            .record(&mut store, &document, BackupKind::Automatic, now())
            .unwrap();

        let reloaded = BackupCatalog::load(&store, limits()).unwrap();
        assert_eq!(reloaded.list(), catalog.list());
    }

    #[test]
    fn test_size_limit_records_failure_without_payload() {
        let mut store = MemoryStore::new();
        store.set("sales", &format!("[\"{}\"]", "x".repeat(2048))).unwrap();
        let document = snapshot(&store);
        assert!(document.size_bytes > 1024);

        let mut catalog = BackupCatalog::new(CatalogLimits {
            max_size_bytes: 1024,
            retention_days: 30,
        });
        let err = catalog
            .record(&mut store, &document, BackupKind::Manual, now())
            .unwrap_err();
        assert!(err.is_size_limit());

        let entry = &catalog.list()[0];
        assert_eq!(entry.status, EntryStatus::Failed);
        assert!(entry.storage_key.is_none());
        assert!(entry.failure_reason.as_deref().unwrap().contains("too large"));
        assert!(store
            .keys()
            .unwrap()
            .iter()
            .all(|k| !k.starts_with(PAYLOAD_KEY_PREFIX)));
    }

    #[test]
    fn test_storage_failure_recorded() {
        let mut source = MemoryStore::new();
        source.set("sales", &format!("[\"{}\"]", "x".repeat(2000))).unwrap();
        let document = snapshot(&source);

        // The failed entry fits in the quota, the payload does not
        let mut store = MemoryStore::with_quota(600);
        let mut catalog = BackupCatalog::new(limits());

        let err = catalog
            .record(&mut store, &document, BackupKind::Automatic, now())
            .unwrap_err();
        assert!(matches!(err, VaultError::StorageWriteFailure(_)));
        assert_eq!(catalog.list()[0].status, EntryStatus::Failed);
        assert_eq!(store.keys().unwrap(), vec![CATALOG_KEY]);
    }

    #[test]
    fn test_list_newest_first_with_unique_ids() {
        let mut store = seeded_store();
        let mut catalog = BackupCatalog::new(limits());
        let document = snapshot(&store);

        let first = catalog
            .record(&mut store, &document, BackupKind::Manual, now())
            .unwrap();
        // Same millisecond still yields a fresh id
        let second = catalog
            .record(&mut store, &document, BackupKind::Manual, now())
            .unwrap();

        assert_ne!(first.id, second.id);
        let ids: Vec<_> = catalog.list().iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn test_record_prunes_expired() {
        let mut store = seeded_store();
        let mut catalog = BackupCatalog::new(limits());
        let document = snapshot(&store);

        let old = catalog
            .record(&mut store, &document, BackupKind::Automatic, now() - Duration::days(45))
            .unwrap();
        let fresh = catalog
            .record(&mut store, &document, BackupKind::Automatic, now())
            .unwrap();

        assert!(catalog.find_by_id(&old.id).is_none());
        assert!(store.get(old.storage_key.as_deref().unwrap()).unwrap().is_none());
        assert!(catalog.find_by_id(&fresh.id).is_some());
    }

    #[test]
    fn test_remove_deletes_payload() {
        let mut store = seeded_store();
        let mut catalog = BackupCatalog::new(limits());
        let document = snapshot(&store);
        let entry = catalog
            .record(&mut store, &document, BackupKind::Manual, now())
            .unwrap();

        assert!(catalog.remove(&mut store, &entry.id).unwrap());
        assert!(catalog.list().is_empty());
        assert!(store.get(entry.storage_key.as_deref().unwrap()).unwrap().is_none());
        assert_eq!(store.get(CATALOG_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_remove_unknown_id_is_noop() {
        let mut store = seeded_store();
        let mut catalog = BackupCatalog::new(limits());
        let document = snapshot(&store);
        catalog
            .record(&mut store, &document, BackupKind::Manual, now())
            .unwrap();
        let before = catalog.list().to_vec();

        assert!(!catalog.remove(&mut store, "does-not-exist").unwrap());
        assert_eq!(catalog.list(), before.as_slice());
    }

    #[test]
    fn test_load_restores_id_sequence() {
        let mut store = seeded_store();
        let mut catalog = BackupCatalog::new(limits());
        let document = snapshot(&store);
        let first = catalog
            .record(&mut store, &document, BackupKind::Manual, now())
            .unwrap();

        let mut reloaded = BackupCatalog::load(&store, limits()).unwrap();
        let next = reloaded
            .record(&mut store, &document, BackupKind::Manual, now())
            .unwrap();
        assert!(next.id.parse::<i64>().unwrap() > first.id.parse::<i64>().unwrap());
    }

    #[test]
    fn test_corrupt_catalog_fails_to_load() {
        let mut store = MemoryStore::new();
        store.set(CATALOG_KEY, "{not a list").unwrap();
        assert!(BackupCatalog::load(&store, limits()).is_err());
    }
}
