//! posvault - snapshot backups for point-of-sale record stores
//!
//! A point-of-sale front end keeps each record category (sales, customers,
//! inventory, suppliers, ...) as one JSON document in a key-value store. This
//! library captures those documents into versioned snapshots, keeps a catalog
//! of backup attempts, prunes old snapshots, runs automatic backups on a
//! schedule and restores snapshots on demand.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Data directory resolution and backup settings
//! - `error`: Custom error types
//! - `storage`: The key-value store contract plus memory and file backends
//! - `backup`: Snapshots, catalog, retention, scheduling, restore, transfer
//! - `notify`: Outcome notifications
//! - `clock`: Time sources
//! - `cli`: Command handlers for the `posvault` binary
//!
//! # Example
//!
//! ```rust,ignore
//! use posvault::backup::BackupService;
//! use posvault::clock::SystemClock;
//! use posvault::config::VaultPaths;
//! use posvault::notify::LogNotifier;
//! use posvault::storage::FileStore;
//!
//! let paths = VaultPaths::new()?;
//! let store = FileStore::open(paths.store_dir())?;
//! let mut service = BackupService::new(store, Box::new(LogNotifier), Box::new(SystemClock))?;
//! service.create_backup()?;
//! ```

pub mod backup;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod notify;
pub mod storage;

pub use error::{VaultError, VaultResult};
