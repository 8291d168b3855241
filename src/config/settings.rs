//! Backup configuration for posvault
//!
//! Manages the automatic backup cadence, retention window, payload encoding and
//! size limits. The configuration lives in the same key-value store as the data
//! it protects, under `CONFIG_KEY`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{VaultError, VaultResult};
use crate::storage::KeyValueStore;

/// Store key holding the serialized configuration
pub const CONFIG_KEY: &str = "backupConfig";

/// How often automatic backups run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    /// Once a day at the configured time
    #[default]
    Daily,
    /// At the configured time, checked once a minute
    Weekly,
    /// Every 60 minutes
    Hourly,
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Weekly => write!(f, "weekly"),
            Self::Hourly => write!(f, "hourly"),
        }
    }
}

impl FromStr for Cadence {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "hourly" => Ok(Self::Hourly),
            other => Err(VaultError::Validation(format!(
                "Unknown cadence '{}', expected daily, weekly or hourly",
                other
            ))),
        }
    }
}

/// A wall-clock time of day, serialized as "HH:MM"
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u32,
    minute: u32,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> VaultResult<Self> {
        if hour > 23 || minute > 59 {
            return Err(VaultError::Validation(format!(
                "Invalid time of day {:02}:{:02}",
                hour, minute
            )));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeOfDay {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VaultError::Validation(format!("Invalid time of day '{}'", s));

        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour: u32 = hour.parse().map_err(|_| invalid())?;
        let minute: u32 = minute.parse().map_err(|_| invalid())?;

        Self::new(hour, minute)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = VaultError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

/// Automatic backup and retention settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupConfig {
    /// Whether scheduled backups run at all
    #[serde(default = "default_true")]
    pub automatic_enabled: bool,

    /// Schedule for automatic backups
    #[serde(default)]
    pub cadence: Cadence,

    /// Wall-clock time used by daily and weekly cadences
    #[serde(default = "default_time_of_day")]
    pub time_of_day: TimeOfDay,

    /// Successful backups older than this many days are pruned
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Store payloads with the reversible text encoding
    #[serde(default)]
    pub encode_payload: bool,

    /// Emit success notifications
    #[serde(default = "default_true")]
    pub notify: bool,

    /// Largest accepted snapshot, in KiB
    #[serde(default = "default_max_size_kb", rename = "maxSizeKB")]
    pub max_size_kb: u64,
}

fn default_true() -> bool {
    true
}

fn default_time_of_day() -> TimeOfDay {
    TimeOfDay { hour: 2, minute: 0 }
}

fn default_retention_days() -> u32 {
    30
}

fn default_max_size_kb() -> u64 {
    5120
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            automatic_enabled: default_true(),
            cadence: Cadence::default(),
            time_of_day: default_time_of_day(),
            retention_days: default_retention_days(),
            encode_payload: false,
            notify: default_true(),
            max_size_kb: default_max_size_kb(),
        }
    }
}

impl BackupConfig {
    /// Size limit in bytes
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_kb.saturating_mul(1024)
    }

    /// Reject settings the rest of the core cannot honor
    pub fn validate(&self) -> VaultResult<()> {
        if self.max_size_kb == 0 {
            return Err(VaultError::Validation(
                "maxSizeKB must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Load the configuration from the store, or defaults if none is saved
    pub fn load_or_default<S: KeyValueStore + ?Sized>(store: &S) -> VaultResult<Self> {
        match store.get(CONFIG_KEY)? {
            Some(contents) => serde_json::from_str(&contents).map_err(|e| {
                VaultError::Config(format!("Failed to parse backup configuration: {}", e))
            }),
            None => Ok(Self::default()),
        }
    }

    /// Persist the configuration to the store
    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> VaultResult<()> {
        let contents = serde_json::to_string(self).map_err(|e| {
            VaultError::Config(format!("Failed to serialize backup configuration: {}", e))
        })?;
        store.set(CONFIG_KEY, &contents)
    }
}
