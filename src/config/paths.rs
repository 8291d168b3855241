//! Path management for posvault
//!
//! ## Path Resolution Order
//!
//! 1. `POSVAULT_DATA_DIR` environment variable (if set)
//! 2. The platform configuration directory reported by `directories`
//!    (`~/.config/posvault` on Linux, `~/Library/Application Support/posvault`
//!    on macOS, `%APPDATA%\posvault\config` on Windows)

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::VaultError;

/// Environment variable overriding the base directory
pub const DATA_DIR_ENV: &str = "POSVAULT_DATA_DIR";

/// Manages all paths used by posvault
#[derive(Debug, Clone)]
pub struct VaultPaths {
    /// Base directory for all posvault data
    base_dir: PathBuf,
}

impl VaultPaths {
    /// Create a new VaultPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined and the
    /// environment override is not set.
    pub fn new() -> Result<Self, VaultError> {
        let base_dir = if let Ok(custom) = std::env::var(DATA_DIR_ENV) {
            PathBuf::from(custom)
        } else {
            ProjectDirs::from("", "", "posvault")
                .map(|dirs| dirs.config_dir().to_path_buf())
                .ok_or_else(|| {
                    VaultError::Config("Could not determine a home directory".into())
                })?
        };

        Ok(Self { base_dir })
    }

    /// Create VaultPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Directory holding the key-value store files
    pub fn store_dir(&self) -> PathBuf {
        self.base_dir.join("store")
    }

    /// Default destination for exported backups
    pub fn exports_dir(&self) -> PathBuf {
        self.base_dir.join("exports")
    }

    /// Ensure all required directories exist
    pub fn ensure_directories(&self) -> Result<(), VaultError> {
        std::fs::create_dir_all(self.store_dir())
            .map_err(|e| VaultError::Io(format!("Failed to create store directory: {}", e)))?;

        std::fs::create_dir_all(self.exports_dir())
            .map_err(|e| VaultError::Io(format!("Failed to create exports directory: {}", e)))?;

        Ok(())
    }
}
