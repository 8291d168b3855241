//! Configuration module for posvault
//!
//! This module provides configuration management including:
//! - Data directory resolution
//! - Backup schedule and retention settings

pub mod paths;
pub mod settings;

pub use paths::VaultPaths;
pub use settings::{BackupConfig, Cadence, TimeOfDay};
