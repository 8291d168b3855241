//! Backup system for posvault
//!
//! Captures every domain key of the point-of-sale store into versioned
//! snapshots, keeps a catalog of attempts, prunes old snapshots, schedules
//! automatic captures and restores snapshots on demand.
//!
//! # Architecture
//!
//! - `SnapshotBuilder`: reads the registered domain keys into a `SnapshotDocument`
//! - `BackupCatalog`: stores payloads and the ordered history of attempts
//! - `retention`: drops successful backups older than the retention window
//! - `Scheduler`: arms and cancels timers for the configured cadence
//! - `RestoreExecutor`: writes a snapshot's domains back into the store
//! - `transfer`: export to and import from standalone JSON documents
//! - `BackupService`: ties the above to one store, notifier and clock
//!
//! # Storage Layout
//!
//! - `backupConfig`: the `BackupConfig`
//! - `backupCatalog`: JSON list of `CatalogEntry`, newest first
//! - `backup_<id>`: one serialized `SnapshotDocument` per successful entry
//!
//! # Example
//!
//! ```rust,ignore
//! use posvault::backup::BackupService;
//! use posvault::clock::SystemClock;
//! use posvault::notify::LogNotifier;
//! use posvault::storage::MemoryStore;
//!
//! let mut service = BackupService::new(
//!     MemoryStore::new(),
//!     Box::new(LogNotifier),
//!     Box::new(SystemClock),
//! )?;
//!
//! let entry = service.create_backup()?;
//! let report = service.restore(&entry.id)?;
//! println!("{}", report.summary());
//! ```

pub mod codec;
mod catalog;
pub mod retention;
mod restore;
mod scheduler;
mod service;
mod snapshot;
pub mod transfer;

pub use catalog::{
    BackupCatalog, BackupKind, CatalogEntry, CatalogLimits, EntryStatus, CATALOG_KEY,
    PAYLOAD_KEY_PREFIX,
};
pub use restore::{load_document, PreparedRestore, RestoreExecutor, RestoreReport};
pub use scheduler::{
    is_overdue, next_occurrence, previous_occurrence, Scheduler, SchedulerState, TimerId,
    TimerPurpose, TimerQueue,
};
pub use service::{format_size, BackupService, BackupStats, STORAGE_WARNING_RATIO};
pub use snapshot::{
    DomainKey, DomainShape, Domains, Environment, SnapshotBuilder, SnapshotDocument,
    DEFAULT_DOMAINS, SCHEMA_VERSION,
};
pub use transfer::ExportArtifact;
