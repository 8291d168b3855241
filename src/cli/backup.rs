//! Backup CLI commands
//!
//! Implements CLI commands for backup management.

use std::fs;
use std::path::PathBuf;

use clap::Subcommand;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::backup::{format_size, BackupService, CatalogEntry, EntryStatus};
use crate::config::paths::VaultPaths;
use crate::error::{VaultError, VaultResult};
use crate::storage::KeyValueStore;

/// Backup subcommands
#[derive(Subcommand)]
pub enum BackupCommands {
    /// Create a new backup
    Create,

    /// List all backup attempts, newest first
    List {
        /// Show failure reasons and storage keys
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show information about a specific backup
    Show {
        /// Backup id (use 'latest' for the most recent successful backup)
        id: String,
    },

    /// Restore from a backup
    Restore {
        /// Backup id (use 'latest' for the most recent successful backup)
        id: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Delete a backup and its stored payload
    Remove {
        /// Backup id
        id: String,
    },

    /// Write a backup to a standalone JSON file
    Export {
        /// Backup id (use 'latest' for the most recent successful backup)
        id: String,

        /// Destination file (defaults to the exports directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import a previously exported backup
    Import {
        /// Path to the exported JSON file
        file: PathBuf,
    },

    /// Delete backups older than the retention window
    Prune {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Encoded")]
    encoded: String,
}

impl From<&CatalogEntry> for EntryRow {
    fn from(entry: &CatalogEntry) -> Self {
        Self {
            id: entry.id.clone(),
            created: entry.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            kind: entry.kind.to_string(),
            status: status_label(entry.status).to_string(),
            size: format_size(entry.size_bytes),
            encoded: if entry.encoded { "yes" } else { "no" }.to_string(),
        }
    }
}

fn status_label(status: EntryStatus) -> &'static str {
    match status {
        EntryStatus::Succeeded => "ok",
        EntryStatus::Failed => "FAILED",
    }
}

/// Handle a backup command
pub fn handle_backup_command<S: KeyValueStore>(
    service: &mut BackupService<S>,
    paths: &VaultPaths,
    cmd: BackupCommands,
) -> VaultResult<()> {
    match cmd {
        BackupCommands::Create => {
            println!("Creating backup...");
            let entry = service.create_backup()?;
            println!("Backup created: {}", entry.id);
            println!("Size: {}", format_size(entry.size_bytes));
        }

        BackupCommands::List { verbose } => {
            let entries = service.list();

            if entries.is_empty() {
                println!("No backups found.");
                println!("Create one with: posvault backup create");
                return Ok(());
            }

            let rows: Vec<EntryRow> = entries.iter().map(EntryRow::from).collect();
            println!("{}", Table::new(rows).with(Style::sharp()));

            if verbose {
                println!();
                for entry in entries {
                    match (&entry.storage_key, &entry.failure_reason) {
                        (Some(key), _) => println!("  {}: stored under {}", entry.id, key),
                        (None, Some(reason)) => println!("  {}: {}", entry.id, reason),
                        (None, None) => println!("  {}: no payload", entry.id),
                    }
                }
            }

            let stats = service.stats();
            println!();
            println!(
                "Total: {} backup(s), {} succeeded, {} failed, {} stored",
                stats.total,
                stats.succeeded,
                stats.failed,
                format_size(stats.stored_bytes)
            );
        }

        BackupCommands::Show { id } => {
            let id = resolve_backup_id(service, &id)?;
            let entry = service
                .find_by_id(&id)
                .ok_or_else(|| VaultError::backup_not_found(&id))?;

            println!("Backup Details");
            println!("==============");
            println!("ID: {}", entry.id);
            println!(
                "Created: {}",
                entry.created_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            println!("Kind: {}", entry.kind);
            println!("Status: {}", status_label(entry.status));
            println!("Size: {}", format_size(entry.size_bytes));
            println!("Encoded: {}", if entry.encoded { "yes" } else { "no" });
            if let Some(key) = &entry.storage_key {
                println!("Storage key: {}", key);
            }
            if let Some(reason) = &entry.failure_reason {
                println!("Failure: {}", reason);
            }
        }

        BackupCommands::Restore { id, force } => {
            let id = resolve_backup_id(service, &id)?;
            let target = service
                .find_by_id(&id)
                .filter(|e| e.is_succeeded())
                .ok_or_else(|| VaultError::backup_not_found(&id))?;

            if !force {
                println!(
                    "WARNING: This will overwrite every record category in backup {} ({})!",
                    target.id,
                    target.created_at.format("%Y-%m-%d %H:%M:%S UTC")
                );
                println!("To proceed, run again with --force flag:");
                println!("  posvault backup restore {} --force", id);
                return Ok(());
            }

            println!("Restoring from backup {}...", id);
            let (safety, report) = service.restore_with_safety_backup(&id)?;
            println!("Pre-restore backup saved: {}", safety.id);
            println!("Restore complete!");
            println!("{}", report.summary());
        }

        BackupCommands::Remove { id } => {
            if service.remove(&id)? {
                println!("Removed backup {}", id);
            } else {
                println!("No backup with id {}; nothing to remove.", id);
            }
        }

        BackupCommands::Export { id, output } => {
            let id = resolve_backup_id(service, &id)?;
            let artifact = service.export(&id)?;

            let path = match output {
                Some(path) => path,
                None => {
                    paths.ensure_directories()?;
                    paths.exports_dir().join(&artifact.filename)
                }
            };
            fs::write(&path, &artifact.contents).map_err(|e| {
                VaultError::Io(format!("Failed to write {}: {}", path.display(), e))
            })?;

            println!("Exported backup {} to {}", id, path.display());
        }

        BackupCommands::Import { file } => {
            let bytes = fs::read(&file).map_err(|e| {
                VaultError::Io(format!("Failed to read {}: {}", file.display(), e))
            })?;
            let entry = service.import(&bytes)?;
            println!("Imported backup {} ({})", entry.id, format_size(entry.size_bytes));
        }

        BackupCommands::Prune { force } => {
            let retention_days = service.config().retention_days;
            let expired = service.expired().len();

            if expired == 0 {
                println!("No backups to prune.");
                println!("Current retention window: {} day(s)", retention_days);
                return Ok(());
            }

            println!(
                "{} backup(s) are older than {} day(s).",
                expired, retention_days
            );

            if !force {
                println!("To delete them, run again with --force flag:");
                println!("  posvault backup prune --force");
                return Ok(());
            }

            let removed = service.prune()?;
            println!("Deleted {} backup(s).", removed.len());
        }
    }

    Ok(())
}

/// Resolve 'latest' to the newest successful backup id
fn resolve_backup_id<S: KeyValueStore>(service: &BackupService<S>, id: &str) -> VaultResult<String> {
    if id.eq_ignore_ascii_case("latest") {
        return service
            .stats()
            .latest
            .map(|entry| entry.id)
            .ok_or_else(|| VaultError::backup_not_found("latest"));
    }
    Ok(id.to_string())
}
