//! Backup service
//!
//! One `BackupService` is constructed per process with the store, notifier and
//! clock it should use. It owns the configuration, catalog and scheduler and
//! is the only entry point the rest of the application needs.
//!
//! Nothing here takes a lock: the service runs on one thread and a manual
//! backup and a timer-triggered one simply run one after the other, the later
//! catalog write winning.

use chrono::{DateTime, FixedOffset, Utc};

use crate::clock::Clock;
use crate::config::settings::BackupConfig;
use crate::error::VaultResult;
use crate::notify::{Notifier, Severity};
use crate::storage::KeyValueStore;

use super::catalog::{BackupCatalog, BackupKind, CatalogEntry, CatalogLimits};
use super::restore::{RestoreExecutor, RestoreReport};
use super::retention;
use super::scheduler::{is_overdue, Scheduler};
use super::snapshot::SnapshotBuilder;
use super::transfer::{self, ExportArtifact};

/// Store usage fraction above which a warning is raised
pub const STORAGE_WARNING_RATIO: f64 = 0.8;

/// Aggregate numbers over the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct BackupStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Sum of the sizes of successful backups
    pub stored_bytes: u64,
    pub latest: Option<CatalogEntry>,
}

/// Snapshot, catalog, retention, scheduling and restore over one store
pub struct BackupService<S: KeyValueStore> {
    store: S,
    notifier: Box<dyn Notifier>,
    clock: Box<dyn Clock>,
    config: BackupConfig,
    builder: SnapshotBuilder,
    catalog: BackupCatalog,
    scheduler: Scheduler,
}

fn limits_for(config: &BackupConfig) -> CatalogLimits {
    CatalogLimits {
        max_size_bytes: config.max_size_bytes(),
        retention_days: config.retention_days,
    }
}

impl<S: KeyValueStore> BackupService<S> {
    /// Load configuration and catalog from `store` and arm the scheduler
    pub fn new(store: S, notifier: Box<dyn Notifier>, clock: Box<dyn Clock>) -> VaultResult<Self> {
        Self::with_builder(store, notifier, clock, SnapshotBuilder::with_defaults())
    }

    /// Like `new`, capturing the domains registered in `builder`
    pub fn with_builder(
        store: S,
        notifier: Box<dyn Notifier>,
        clock: Box<dyn Clock>,
        builder: SnapshotBuilder,
    ) -> VaultResult<Self> {
        let config = BackupConfig::load_or_default(&store)?;
        let catalog = BackupCatalog::load(&store, limits_for(&config))?;

        let mut service = Self {
            store,
            notifier,
            clock,
            config,
            builder,
            catalog,
            scheduler: Scheduler::new(),
        };
        let now = service.clock.now();
        service.scheduler.reschedule(&service.config, now);
        Ok(service)
    }

    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    /// Validate, persist and apply a new configuration
    pub fn save_config(&mut self, config: BackupConfig) -> VaultResult<()> {
        config.validate()?;
        config.save(&mut self.store)?;

        self.catalog.set_limits(limits_for(&config));
        self.config = config;

        let now = self.clock.now();
        self.scheduler.reschedule(&self.config, now);
        Ok(())
    }

    /// Take a manual backup
    ///
    /// Failures are recorded in the catalog, reported to the notifier and
    /// returned.
    pub fn create_backup(&mut self) -> VaultResult<CatalogEntry> {
        self.capture(BackupKind::Manual)
    }

    /// Fire due timers and run the automatic backups they call for
    ///
    /// Returns the number of backups attempted. Failures never escape; they
    /// are reported through the notifier.
    pub fn tick(&mut self) -> usize {
        let now = self.clock.now();
        let due = self.scheduler.poll(now);

        for purpose in &due {
            tracing::debug!(?purpose, "Automatic backup due");
            // Already recorded and notified inside capture
            let _ = self.capture(BackupKind::Automatic);
        }

        due.len()
    }

    /// Run one automatic backup if the cadence says one is owed
    ///
    /// Timers armed at startup never fire at the instant they are armed, so a
    /// host that starts, checks and exits relies on this instead. Returns the
    /// number of backups attempted.
    pub fn run_overdue(&mut self) -> usize {
        let now = self.clock.now();
        let last_automatic = self
            .catalog
            .list()
            .iter()
            .find(|e| e.kind == BackupKind::Automatic)
            .map(|e| e.created_at.with_timezone(now.offset()));

        if !is_overdue(&self.config, last_automatic, now) {
            return 0;
        }

        tracing::debug!(?last_automatic, "Automatic backup overdue");
        // Already recorded and notified inside capture
        let _ = self.capture(BackupKind::Automatic);
        1
    }

    /// Earliest pending timer deadline
    pub fn next_due(&self) -> Option<DateTime<FixedOffset>> {
        self.scheduler.next_due()
    }

    fn capture(&mut self, kind: BackupKind) -> VaultResult<CatalogEntry> {
        let now = self.clock.now().with_timezone(&Utc);

        let result = self
            .builder
            .build(&self.store, now, self.config.encode_payload)
            .and_then(|document| self.catalog.record(&mut self.store, &document, kind, now));

        let label = capitalize(&kind.to_string());
        match &result {
            Ok(entry) => {
                self.notify_success(&format!(
                    "{} backup created ({})",
                    label,
                    format_size(entry.size_bytes)
                ));
                self.check_storage_usage();
            }
            Err(err) => self.notify_failure(&format!("{} backup failed: {}", label, err)),
        }

        result
    }

    /// All catalog entries, newest first
    pub fn list(&self) -> &[CatalogEntry] {
        self.catalog.list()
    }

    pub fn find_by_id(&self, id: &str) -> Option<&CatalogEntry> {
        self.catalog.find_by_id(id)
    }

    /// Delete a backup and its payload; unknown ids are a no-op
    pub fn remove(&mut self, id: &str) -> VaultResult<bool> {
        self.catalog.remove(&mut self.store, id)
    }

    /// Entries the next prune would remove
    pub fn expired(&self) -> Vec<&CatalogEntry> {
        let now = self.clock.now().with_timezone(&Utc);
        let cutoff = retention::cutoff(now, self.config.retention_days);
        self.catalog
            .list()
            .iter()
            .filter(|e| retention::is_expired(e, cutoff))
            .collect()
    }

    /// Apply the retention window now
    pub fn prune(&mut self) -> VaultResult<Vec<CatalogEntry>> {
        let now = self.clock.now().with_timezone(&Utc);
        self.catalog.enforce_retention(&mut self.store, now)
    }

    /// Overwrite the store with the contents of a backup
    ///
    /// Callers holding store data in memory must reload it afterwards.
    pub fn restore(&mut self, id: &str) -> VaultResult<RestoreReport> {
        let result = RestoreExecutor::restore(&self.catalog, &mut self.store, id);
        self.report_restore(result)
    }

    /// Capture the current state, then restore a backup over it
    ///
    /// The target is loaded before the safety capture. An unknown or failed
    /// target leaves the catalog untouched, and the capture's retention pass
    /// cannot take the target away mid-restore.
    pub fn restore_with_safety_backup(
        &mut self,
        id: &str,
    ) -> VaultResult<(CatalogEntry, RestoreReport)> {
        let prepared = match RestoreExecutor::prepare(&self.catalog, &self.store, id) {
            Ok(prepared) => prepared,
            Err(err) => {
                self.notify_failure(&format!("Restore failed: {}", err));
                return Err(err);
            }
        };

        let safety = self.capture(BackupKind::Manual)?;
        let result = RestoreExecutor::apply(&mut self.store, prepared);
        let report = self.report_restore(result)?;
        Ok((safety, report))
    }

    fn report_restore(&self, result: VaultResult<RestoreReport>) -> VaultResult<RestoreReport> {
        match &result {
            Ok(report) => self.notify_success(&format!(
                "Backup from {} restored",
                report.backup_date.format("%Y-%m-%d %H:%M")
            )),
            Err(err) => self.notify_failure(&format!("Restore failed: {}", err)),
        }
        result
    }

    /// Serialize a backup for download
    pub fn export(&self, id: &str) -> VaultResult<ExportArtifact> {
        transfer::export(&self.catalog, &self.store, id)
    }

    /// Validate and record an exported document
    pub fn import(&mut self, bytes: &[u8]) -> VaultResult<CatalogEntry> {
        let now = self.clock.now().with_timezone(&Utc);
        match transfer::import(&mut self.catalog, &mut self.store, bytes, now) {
            Ok(entry) => {
                self.notify_success(&format!("Backup imported ({})", format_size(entry.size_bytes)));
                self.check_storage_usage();
                Ok(entry)
            }
            Err(err) => {
                self.notify_failure(&format!("Import failed: {}", err));
                Err(err)
            }
        }
    }

    pub fn stats(&self) -> BackupStats {
        let entries = self.catalog.list();
        let succeeded: Vec<_> = entries.iter().filter(|e| e.is_succeeded()).collect();

        BackupStats {
            total: entries.len(),
            succeeded: succeeded.len(),
            failed: entries.len() - succeeded.len(),
            stored_bytes: succeeded.iter().map(|e| e.size_bytes).sum(),
            latest: self.catalog.latest_succeeded().cloned(),
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Direct store access; catalog and config keys should be left alone
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    fn notify_success(&self, message: &str) {
        if self.config.notify {
            self.notifier.notify(message, Severity::Success);
        }
    }

    fn notify_failure(&self, message: &str) {
        self.notifier.notify(message, Severity::Error);
    }

    fn check_storage_usage(&self) {
        let Some(capacity) = self.store.capacity_hint() else {
            return;
        };

        match self.store.usage_bytes() {
            Ok(used) if capacity > 0 && used as f64 > capacity as f64 * STORAGE_WARNING_RATIO => {
                self.notifier.notify(
                    &format!(
                        "Storage is {}% full ({} of {}); consider exporting and removing old backups",
                        used * 100 / capacity,
                        format_size(used),
                        format_size(capacity)
                    ),
                    Severity::Warning,
                );
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Could not measure storage usage"),
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Format a byte count in human-readable form
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
