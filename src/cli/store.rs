//! Store CLI commands
//!
//! Direct access to the record store, mostly for seeding and inspection.

use std::fs;
use std::path::PathBuf;

use clap::Subcommand;

use crate::error::{VaultError, VaultResult};
use crate::storage::KeyValueStore;

/// Store subcommands
#[derive(Subcommand)]
pub enum StoreCommands {
    /// List all keys
    Keys,

    /// Print the value stored under a key
    Get {
        key: String,
    },

    /// Store a value under a key
    Put {
        key: String,

        /// Value to store
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        value: Option<String>,

        /// Read the value from a file instead
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Handle a store command
pub fn handle_store_command<S: KeyValueStore>(store: &mut S, cmd: StoreCommands) -> VaultResult<()> {
    match cmd {
        StoreCommands::Keys => {
            let keys = store.keys()?;
            if keys.is_empty() {
                println!("Store is empty.");
            }
            for key in keys {
                println!("{}", key);
            }
        }

        StoreCommands::Get { key } => {
            let value = store
                .get(&key)?
                .ok_or_else(|| VaultError::key_not_found(&key))?;
            println!("{}", value);
        }

        StoreCommands::Put { key, value, file } => {
            let value = match (value, file) {
                (Some(value), _) => value,
                (None, Some(path)) => fs::read_to_string(&path).map_err(|e| {
                    VaultError::Io(format!("Failed to read {}: {}", path.display(), e))
                })?,
                (None, None) => {
                    return Err(VaultError::Validation("A value or --file is required".into()))
                }
            };
            store.set(&key, &value)?;
            println!("Stored {} ({} bytes)", key, value.len());
        }
    }

    Ok(())
}
