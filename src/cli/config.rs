//! Configuration CLI commands

use clap::Subcommand;

use crate::backup::{format_size, BackupService};
use crate::config::paths::VaultPaths;
use crate::config::settings::{Cadence, TimeOfDay};
use crate::error::VaultResult;
use crate::storage::KeyValueStore;

/// Configuration subcommands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the backup configuration and paths
    Show,

    /// Change backup settings
    Set {
        /// Enable or disable automatic backups
        #[arg(long)]
        automatic: Option<bool>,

        /// Automatic backup cadence (daily, weekly, hourly)
        #[arg(long)]
        cadence: Option<Cadence>,

        /// Time of day for daily and weekly backups (HH:MM)
        #[arg(long)]
        time: Option<TimeOfDay>,

        /// Days to keep successful backups
        #[arg(long)]
        retention_days: Option<u32>,

        /// Store payloads encoded
        #[arg(long)]
        encode: Option<bool>,

        /// Send success notifications
        #[arg(long)]
        notify: Option<bool>,

        /// Largest accepted snapshot in KiB
        #[arg(long)]
        max_size_kb: Option<u64>,
    },
}

/// Handle a config command
pub fn handle_config_command<S: KeyValueStore>(
    service: &mut BackupService<S>,
    paths: &VaultPaths,
    cmd: ConfigCommands,
) -> VaultResult<()> {
    match cmd {
        ConfigCommands::Show => {
            let config = service.config();

            println!("posvault Configuration");
            println!("======================");
            println!("Data directory:   {}", paths.base_dir().display());
            println!("Store directory:  {}", paths.store_dir().display());
            println!("Export directory: {}", paths.exports_dir().display());
            println!();
            println!("Backups:");
            println!("  Automatic:      {}", config.automatic_enabled);
            println!("  Cadence:        {}", config.cadence);
            println!("  Time of day:    {}", config.time_of_day);
            println!("  Retention:      {} day(s)", config.retention_days);
            println!("  Encode payload: {}", config.encode_payload);
            println!("  Notifications:  {}", config.notify);
            println!(
                "  Max size:       {}",
                format_size(config.max_size_bytes())
            );
            match service.next_due() {
                Some(due) => println!("  Next timer:     {}", due.format("%Y-%m-%d %H:%M")),
                None => println!("  Next timer:     none"),
            }
        }

        ConfigCommands::Set {
            automatic,
            cadence,
            time,
            retention_days,
            encode,
            notify,
            max_size_kb,
        } => {
            let mut config = service.config().clone();

            if let Some(value) = automatic {
                config.automatic_enabled = value;
            }
            if let Some(value) = cadence {
                config.cadence = value;
            }
            if let Some(value) = time {
                config.time_of_day = value;
            }
            if let Some(value) = retention_days {
                config.retention_days = value;
            }
            if let Some(value) = encode {
                config.encode_payload = value;
            }
            if let Some(value) = notify {
                config.notify = value;
            }
            if let Some(value) = max_size_kb {
                config.max_size_kb = value;
            }

            service.save_config(config)?;
            println!("Configuration saved.");
        }
    }

    Ok(())
}
