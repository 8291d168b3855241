//! Time source for captures and scheduling
//!
//! Timestamps carry the local UTC offset so that time-of-day cadences can be
//! compared against the wall clock while catalog records stay in UTC.

use std::cell::Cell;
use std::rc::Rc;

use chrono::{DateTime, Duration, FixedOffset, Local};

/// Source of the current wall-clock time
pub trait Clock {
    /// Current time with the local UTC offset
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Reads the system clock in the local timezone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// A settable clock shared between clones
///
/// Cloning yields a handle to the same instant, so a test can keep one handle
/// and hand another to the service under test.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Rc<Cell<DateTime<FixedOffset>>>,
}

impl ManualClock {
    /// Create a clock frozen at the given instant
    pub fn new(start: DateTime<FixedOffset>) -> Self {
        Self {
            current: Rc::new(Cell::new(start)),
        }
    }

    /// Move the clock to an absolute instant
    pub fn set(&self, instant: DateTime<FixedOffset>) {
        self.current.set(instant);
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        self.current.set(self.current.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.current.get()
    }
}
