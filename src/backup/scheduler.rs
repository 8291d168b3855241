//! Automatic backup scheduling
//!
//! Timers live in a `TimerQueue` that the host polls with the current time.
//! The `Scheduler` owns every timer it arms and cancels all of them before
//! arming replacements, so reconfiguring never leaks a timer.
//!
//! Cadences:
//! - daily: a one-shot timer at the next occurrence of the time of day, which
//!   on firing arms a recurring 24 hour timer
//! - weekly: a 60 second check that captures whenever the wall clock's
//!   hour and minute equal the time of day
//! - hourly: a recurring 60 minute timer

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, TimeZone, Timelike};

use crate::config::settings::{BackupConfig, Cadence, TimeOfDay};

pub type TimerId = u64;

/// Why a timer exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPurpose {
    /// First daily capture; re-arms itself as `DailyRecurring`
    DailyFirstRun,
    DailyRecurring,
    /// Minute tick comparing the wall clock to the weekly time
    WeeklyCheck,
    Hourly,
}

#[derive(Debug, Clone)]
struct Timer {
    id: TimerId,
    purpose: TimerPurpose,
    due: DateTime<FixedOffset>,
    interval: Option<Duration>,
}

/// Cancellable one-shot and recurring timers, fired by polling
#[derive(Debug, Default)]
pub struct TimerQueue {
    timers: Vec<Timer>,
    next_id: TimerId,
    armed_total: u64,
    cancelled_total: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a timer that fires once at `due`
    pub fn arm_once(&mut self, purpose: TimerPurpose, due: DateTime<FixedOffset>) -> TimerId {
        self.push(purpose, due, None)
    }

    /// Arm a timer that fires at `first_due` and then every `interval`
    pub fn arm_every(
        &mut self,
        purpose: TimerPurpose,
        first_due: DateTime<FixedOffset>,
        interval: Duration,
    ) -> TimerId {
        self.push(purpose, first_due, Some(interval))
    }

    fn push(
        &mut self,
        purpose: TimerPurpose,
        due: DateTime<FixedOffset>,
        interval: Option<Duration>,
    ) -> TimerId {
        self.next_id += 1;
        self.armed_total += 1;
        self.timers.push(Timer {
            id: self.next_id,
            purpose,
            due,
            interval,
        });
        tracing::debug!(id = self.next_id, ?purpose, %due, "Armed timer");
        self.next_id
    }

    /// Cancel a timer; returns false if it was not armed
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        let removed = self.timers.len() != before;
        if removed {
            self.cancelled_total += 1;
            tracing::debug!(id, "Cancelled timer");
        }
        removed
    }

    /// Fire every timer due at or before `now`
    ///
    /// One-shot timers are removed. Recurring timers fire once even if several
    /// intervals were missed, then move to their next deadline after `now`.
    pub fn take_due(&mut self, now: DateTime<FixedOffset>) -> Vec<(TimerId, TimerPurpose)> {
        let mut fired = Vec::new();

        self.timers.retain_mut(|timer| {
            if timer.due > now {
                return true;
            }
            fired.push((timer.id, timer.purpose));
            match timer.interval {
                Some(interval) if interval > Duration::zero() => {
                    while timer.due <= now {
                        timer.due = timer.due + interval;
                    }
                    true
                }
                _ => false,
            }
        });

        fired
    }

    /// Earliest pending deadline
    pub fn next_due(&self) -> Option<DateTime<FixedOffset>> {
        self.timers.iter().map(|t| t.due).min()
    }

    /// Number of armed timers
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Timers armed over the queue's lifetime
    pub fn armed_total(&self) -> u64 {
        self.armed_total
    }

    /// Timers cancelled over the queue's lifetime
    pub fn cancelled_total(&self) -> u64 {
        self.cancelled_total
    }
}

/// Whether the scheduler has timers registered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Armed,
}

/// Turns a backup configuration into armed timers
#[derive(Debug, Default)]
pub struct Scheduler {
    queue: TimerQueue,
    owned: Vec<TimerId>,
    time_of_day: Option<TimeOfDay>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SchedulerState {
        if self.owned.is_empty() {
            SchedulerState::Idle
        } else {
            SchedulerState::Armed
        }
    }

    /// Cancel every owned timer and arm the ones `config` calls for
    ///
    /// Returns the number of timers armed.
    pub fn reschedule(&mut self, config: &BackupConfig, now: DateTime<FixedOffset>) -> usize {
        self.stop();

        if !config.automatic_enabled {
            tracing::info!("Automatic backups disabled");
            return 0;
        }

        let id = match config.cadence {
            Cadence::Daily => {
                let due = next_occurrence(config.time_of_day, now);
                self.queue.arm_once(TimerPurpose::DailyFirstRun, due)
            }
            Cadence::Weekly => {
                self.time_of_day = Some(config.time_of_day);
                self.queue.arm_every(
                    TimerPurpose::WeeklyCheck,
                    now + Duration::seconds(60),
                    Duration::seconds(60),
                )
            }
            Cadence::Hourly => self.queue.arm_every(
                TimerPurpose::Hourly,
                now + Duration::minutes(60),
                Duration::minutes(60),
            ),
        };
        self.owned.push(id);

        tracing::info!(
            cadence = %config.cadence,
            time_of_day = %config.time_of_day,
            next_due = ?self.queue.next_due(),
            "Scheduled automatic backups"
        );
        self.owned.len()
    }

    /// Cancel every owned timer
    pub fn stop(&mut self) {
        for id in self.owned.drain(..) {
            self.queue.cancel(id);
        }
        self.time_of_day = None;
    }

    /// Fire due timers and report the captures they call for
    pub fn poll(&mut self, now: DateTime<FixedOffset>) -> Vec<TimerPurpose> {
        let mut captures = Vec::new();

        for (id, purpose) in self.queue.take_due(now) {
            match purpose {
                TimerPurpose::DailyFirstRun => {
                    self.owned.retain(|owned| *owned != id);
                    let recurring = self.queue.arm_every(
                        TimerPurpose::DailyRecurring,
                        now + Duration::hours(24),
                        Duration::hours(24),
                    );
                    self.owned.push(recurring);
                    captures.push(purpose);
                }
                TimerPurpose::WeeklyCheck => {
                    if self.time_of_day.map_or(false, |tod| matches_minute(tod, now)) {
                        captures.push(purpose);
                    }
                }
                TimerPurpose::DailyRecurring | TimerPurpose::Hourly => captures.push(purpose),
            }
        }

        captures
    }

    /// Earliest deadline among owned timers
    pub fn next_due(&self) -> Option<DateTime<FixedOffset>> {
        self.queue.next_due()
    }

    /// Number of timers currently armed
    pub fn active_timers(&self) -> usize {
        self.owned.len()
    }

    /// The underlying queue, for inspection
    pub fn queue(&self) -> &TimerQueue {
        &self.queue
    }
}

/// Next instant strictly after `now` at the given wall-clock time
pub fn next_occurrence(time_of_day: TimeOfDay, now: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    let time = NaiveTime::from_hms_opt(time_of_day.hour(), time_of_day.minute(), 0)
        .unwrap_or_default();
    let today = now
        .offset()
        .from_local_datetime(&now.date_naive().and_time(time))
        .single()
        .unwrap_or(now);

    if today <= now {
        today + Duration::days(1)
    } else {
        today
    }
}

/// Latest instant at or before `now` at the given wall-clock time
pub fn previous_occurrence(
    time_of_day: TimeOfDay,
    now: DateTime<FixedOffset>,
) -> DateTime<FixedOffset> {
    next_occurrence(time_of_day, now) - Duration::days(1)
}

/// Whether an automatic capture is owed, judged from the last automatic attempt
///
/// Used when no timer has had a chance to fire, e.g. by a host that starts,
/// checks once and exits. Daily and weekly are owed when no attempt happened
/// since the latest occurrence of the time of day; hourly when the last attempt
/// is an hour old. Failed attempts count, so a failure is not retried here.
pub fn is_overdue(
    config: &BackupConfig,
    last_automatic: Option<DateTime<FixedOffset>>,
    now: DateTime<FixedOffset>,
) -> bool {
    if !config.automatic_enabled {
        return false;
    }

    match config.cadence {
        Cadence::Hourly => last_automatic.map_or(true, |last| now - last >= Duration::minutes(60)),
        Cadence::Daily | Cadence::Weekly => {
            let since = previous_occurrence(config.time_of_day, now);
            last_automatic.map_or(true, |last| last < since)
        }
    }
}

fn matches_minute(time_of_day: TimeOfDay, now: DateTime<FixedOffset>) -> bool {
    now.hour() == time_of_day.hour() && now.minute() == time_of_day.minute()
}
