//! Export and import of snapshot documents
//!
//! The export artifact is the stored snapshot document itself, pretty-printed,
//! with a filename carrying the capture date. Import accepts exactly that
//! structure back and files it in the catalog as an imported backup.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{VaultError, VaultResult};
use crate::storage::KeyValueStore;

use super::catalog::{BackupCatalog, BackupKind, CatalogEntry};
use super::restore::load_document;
use super::snapshot::SnapshotDocument;

/// A snapshot ready to be written out
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    /// Suggested file name, e.g. `pos-backup-2025-06-30-1751284800000.json`
    pub filename: String,
    /// Serialized snapshot document
    pub contents: String,
}

/// Serialize the snapshot behind a catalog entry
pub fn export<S: KeyValueStore + ?Sized>(
    catalog: &BackupCatalog,
    store: &S,
    entry_id: &str,
) -> VaultResult<ExportArtifact> {
    let entry = catalog
        .find_by_id(entry_id)
        .filter(|e| e.is_succeeded())
        .ok_or_else(|| VaultError::backup_not_found(entry_id))?;
    let storage_key = entry
        .storage_key
        .as_deref()
        .ok_or_else(|| VaultError::backup_not_found(entry_id))?;

    let document = load_document(store, storage_key)?;
    let contents = serde_json::to_string_pretty(&document)?;

    Ok(ExportArtifact {
        filename: format!(
            "pos-backup-{}-{}.json",
            document.created_at.format("%Y-%m-%d"),
            entry.id
        ),
        contents,
    })
}

/// Parse and validate an exported document
///
/// Malformed input fails with `InvalidFormat`. The size is re-measured so a
/// stale `sizeBytes` field cannot slip past the size limit.
pub fn parse_import(bytes: &[u8]) -> VaultResult<SnapshotDocument> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| VaultError::InvalidFormat(format!("Not a JSON document: {}", e)))?;

    let object = value
        .as_object()
        .ok_or_else(|| VaultError::InvalidFormat("Expected a JSON object".into()))?;

    match object.get("schemaVersion").and_then(Value::as_str) {
        Some(version) if !version.trim().is_empty() => {}
        _ => return Err(VaultError::InvalidFormat("Missing schemaVersion".into())),
    }

    let mut document: SnapshotDocument = serde_json::from_value(value)
        .map_err(|e| VaultError::InvalidFormat(format!("Not a snapshot document: {}", e)))?;

    document.check_shape()?;
    document.size_bytes = document.measure()?;
    Ok(document)
}

/// Validate an exported document and record it as an imported backup
pub fn import<S: KeyValueStore + ?Sized>(
    catalog: &mut BackupCatalog,
    store: &mut S,
    bytes: &[u8],
    now: DateTime<Utc>,
) -> VaultResult<CatalogEntry> {
    let document = parse_import(bytes).map_err(|e| {
        tracing::warn!(error = %e, "Rejected backup import");
        e
    })?;
    catalog.record(store, &document, BackupKind::Imported, now)
}
