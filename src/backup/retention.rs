//! Retention policy for catalog entries
//!
//! Successful backups older than the retention window are removed together with
//! their payloads. Failed entries are never pruned so they stay visible for
//! diagnosis.

use chrono::{DateTime, Duration, Utc};

use crate::storage::KeyValueStore;

use super::catalog::{CatalogEntry, EntryStatus};

/// Result of a pruning pass
#[derive(Debug, Default)]
pub struct PruneOutcome {
    /// Entries that survive, in their original order
    pub kept: Vec<CatalogEntry>,
    /// Entries removed along with their payloads
    pub removed: Vec<CatalogEntry>,
}

/// Whether an entry falls outside the retention window
pub fn is_expired(entry: &CatalogEntry, cutoff: DateTime<Utc>) -> bool {
    entry.status == EntryStatus::Succeeded && entry.created_at < cutoff
}

/// Start of the retention window
pub fn cutoff(now: DateTime<Utc>, retention_days: u32) -> DateTime<Utc> {
    now - Duration::days(i64::from(retention_days))
}

/// Drop expired entries and delete their payloads
///
/// An entry whose payload cannot be deleted is kept so the catalog never points
/// at data it no longer tracks.
pub fn prune<S: KeyValueStore + ?Sized>(
    entries: Vec<CatalogEntry>,
    retention_days: u32,
    now: DateTime<Utc>,
    store: &mut S,
) -> PruneOutcome {
    let cutoff = cutoff(now, retention_days);
    let mut outcome = PruneOutcome::default();

    for entry in entries {
        if !is_expired(&entry, cutoff) {
            outcome.kept.push(entry);
            continue;
        }

        if let Some(key) = &entry.storage_key {
            if let Err(e) = store.delete(key) {
                tracing::warn!(id = %entry.id, error = %e, "Failed to delete expired backup payload");
                outcome.kept.push(entry);
                continue;
            }
        }

        tracing::info!(id = %entry.id, created_at = %entry.created_at, "Pruned expired backup");
        outcome.removed.push(entry);
    }

    outcome
}
