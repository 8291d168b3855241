//! Notification collaborator
//!
//! The backup core reports every terminal outcome (success, failure, storage
//! warning) as a message with a severity. How the message reaches a person is
//! up to the implementation.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, Utc};

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Informational message
    Info,
    /// Success message
    Success,
    /// Warning message
    Warning,
    /// Error message
    Error,
}

impl Severity {
    /// Get the icon/prefix for this severity
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Info => "i",
            Self::Success => "+",
            Self::Warning => "!",
            Self::Error => "x",
        }
    }
}

/// A delivered notification
#[derive(Debug, Clone)]
pub struct Notification {
    /// The notification message
    pub message: String,
    /// Severity of the notification
    pub severity: Severity,
    /// When the notification was raised
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Create a new notification stamped with the current time
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
            created_at: Utc::now(),
        }
    }
}

/// Receives outcome messages from the backup core
pub trait Notifier {
    fn notify(&self, message: &str, severity: Severity);
}

/// Forwards notifications to the tracing subscriber
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Info | Severity::Success => {
                tracing::info!(icon = severity.icon(), "{}", message)
            }
            Severity::Warning => tracing::warn!(icon = severity.icon(), "{}", message),
            Severity::Error => tracing::error!(icon = severity.icon(), "{}", message),
        }
    }
}

/// Collects notifications in memory
///
/// Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryNotifier {
    received: Rc<RefCell<Vec<Notification>>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All notifications received so far, oldest first
    pub fn notifications(&self) -> Vec<Notification> {
        self.received.borrow().clone()
    }

    /// Notifications of one severity
    pub fn with_severity(&self, severity: Severity) -> Vec<Notification> {
        self.received
            .borrow()
            .iter()
            .filter(|n| n.severity == severity)
            .cloned()
            .collect()
    }

    /// Drop everything received so far
    pub fn clear(&self) {
        self.received.borrow_mut().clear();
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        self.received
            .borrow_mut()
            .push(Notification::new(message, severity));
    }
}
