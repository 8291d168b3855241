//! Custom error types for posvault
//!
//! This module defines the error hierarchy for the backup core using thiserror
//! for ergonomic error definitions.

use thiserror::Error;

/// The main error type for posvault operations
#[derive(Error, Debug)]
pub enum VaultError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Validation errors for configuration and keys
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Snapshot is larger than the configured limit
    #[error("Snapshot too large: {size_bytes} bytes exceeds limit of {limit_bytes} bytes")]
    SizeLimitExceeded { size_bytes: u64, limit_bytes: u64 },

    /// The key-value store rejected a write
    #[error("Storage write failed: {0}")]
    StorageWriteFailure(String),

    /// A stored snapshot payload is missing or unreadable
    #[error("Corrupt backup payload: {0}")]
    CorruptPayload(String),

    /// Imported data does not have the snapshot document structure
    #[error("Invalid backup format: {0}")]
    InvalidFormat(String),
}

impl VaultError {
    /// Create a "not found" error for catalog entries
    pub fn backup_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Backup",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for store keys
    pub fn key_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Key",
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this error came from the size limit check
    pub fn is_size_limit(&self) -> bool {
        matches!(self, Self::SizeLimitExceeded { .. })
    }
}

impl From<std::io::Error> for VaultError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for posvault operations
pub type VaultResult<T> = Result<T, VaultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VaultError::Config("test error".into());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_not_found_error() {
        let err = VaultError::backup_not_found("1700000000000");
        assert_eq!(err.to_string(), "Backup not found: 1700000000000");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_size_limit_error() {
        let err = VaultError::SizeLimitExceeded {
            size_bytes: 2048,
            limit_bytes: 1024,
        };
        assert_eq!(
            err.to_string(),
            "Snapshot too large: 2048 bytes exceeds limit of 1024 bytes"
        );
        assert!(err.is_size_limit());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let vault_err: VaultError = io_err.into();
        assert!(matches!(vault_err, VaultError::Io(_)));
    }
}
