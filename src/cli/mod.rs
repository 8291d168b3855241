//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the backup service.

pub mod backup;
pub mod config;
pub mod store;

pub use backup::{handle_backup_command, BackupCommands};
pub use config::{handle_config_command, ConfigCommands};
pub use store::{handle_store_command, StoreCommands};

use std::time::Duration as StdDuration;

use chrono::Local;

use crate::backup::BackupService;
use crate::storage::KeyValueStore;

/// Longest the run loop sleeps between polls
const MAX_POLL_INTERVAL: StdDuration = StdDuration::from_secs(30);

/// Drive the scheduler until the process is stopped
///
/// Starts by running a capture the cadence already owes, since freshly armed
/// timers are never due at startup. With `once`, returns after that check and
/// a single poll, reporting how many backups were attempted.
pub fn run_scheduler<S: KeyValueStore>(service: &mut BackupService<S>, once: bool) -> usize {
    tracing::info!(next_due = ?service.next_due(), "Backup scheduler running");

    let mut attempted = service.run_overdue();

    loop {
        let fired = service.tick();
        if fired > 0 {
            tracing::debug!(attempted = fired, "Ran automatic backups");
        }
        attempted += fired;

        if once {
            return attempted;
        }

        let sleep_for = service
            .next_due()
            .and_then(|due| (due - Local::now().fixed_offset()).to_std().ok())
            .map_or(MAX_POLL_INTERVAL, |wait| wait.min(MAX_POLL_INTERVAL));
        std::thread::sleep(sleep_for);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::BackupKind;
    use crate::clock::ManualClock;
    use crate::config::{BackupConfig, Cadence};
    use crate::notify::MemoryNotifier;
    use crate::storage::MemoryStore;
    use chrono::{DateTime, Duration};

    fn hourly_service() -> (BackupService<MemoryStore>, ManualClock) {
        let clock =
            ManualClock::new(DateTime::parse_from_rfc3339("2025-06-01T03:00:00+00:00").unwrap());
        let mut service = BackupService::new(
            MemoryStore::new(),
            Box::new(MemoryNotifier::new()),
            Box::new(clock.clone()),
        )
        .unwrap();
        service
            .save_config(BackupConfig {
                cadence: Cadence::Hourly,
                ..BackupConfig::default()
            })
            .unwrap();
        (service, clock)
    }

    #[test]
    fn test_run_once_captures_owed_backup() {
        let (mut service, clock) = hourly_service();

        assert_eq!(run_scheduler(&mut service, true), 1);
        assert_eq!(service.list()[0].kind, BackupKind::Automatic);

        // Nothing owed within the same hour
        clock.advance(Duration::minutes(30));
        assert_eq!(run_scheduler(&mut service, true), 0);
        assert_eq!(service.list().len(), 1);
    }

    #[test]
    fn test_run_once_skips_when_disabled() {
        let (mut service, _clock) = hourly_service();
        service
            .save_config(BackupConfig {
                automatic_enabled: false,
                ..BackupConfig::default()
            })
            .unwrap();

        assert_eq!(run_scheduler(&mut service, true), 0);
        assert!(service.list().is_empty());
    }
}
