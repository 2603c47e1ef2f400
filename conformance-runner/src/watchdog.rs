// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-test timeout tracking.
//!
//! A [`Watchdog`] doesn't own a timer. Instead, its owner schedules a wake when [`Watchdog::arm`]
//! returns [`WatchdogArm::Started`], and calls [`Watchdog::check`] on every wake. The check either
//! fires, exits, or asks for another wake. Progress moves the deadline forward without disturbing
//! the wake that's already scheduled, so at most one wake is outstanding per test.

use std::time::Duration;
use tokio::time::Instant;

/// The shortest delay between two wakes of the same watchdog.
pub const MINIMUM_TICK: Duration = Duration::from_millis(5);

/// The default delay after which a test without progress is declared timed out.
pub const DEFAULT_TIMEOUT_DELAY: Duration = Duration::from_millis(20000);

/// Deadline state for a single running test.
#[derive(Clone, Debug)]
pub struct Watchdog {
    delay: Duration,
    deadline: Option<Instant>,
    last_progress: Instant,
    wake_scheduled: bool,
}

/// The result of [`Watchdog::arm`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchdogArm {
    /// No wake was scheduled. The owner must schedule one after this delay.
    Started(Duration),

    /// A wake is already scheduled, and it will observe the new deadline.
    Extended,
}

/// The result of [`Watchdog::check`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchdogCheck {
    /// The watchdog was cleared. The wake loop ends without firing.
    Cleared,

    /// The deadline passed without progress. The wake loop ends.
    Fired,

    /// The deadline hasn't passed yet. The owner must wake again after this delay.
    Rescheduled(Duration),
}

impl Watchdog {
    /// Creates a new, unarmed watchdog.
    pub fn new(delay: Duration, now: Instant) -> Self {
        Self {
            delay,
            deadline: None,
            last_progress: now,
            wake_scheduled: false,
        }
    }

    /// Records progress at `now` and moves the deadline to `now + delay`.
    pub fn arm(&mut self, now: Instant) -> WatchdogArm {
        self.last_progress = now;
        self.deadline = Some(now + self.delay);
        if self.wake_scheduled {
            WatchdogArm::Extended
        } else {
            self.wake_scheduled = true;
            WatchdogArm::Started(self.delay)
        }
    }

    /// Clears the deadline. The next wake exits without firing.
    pub fn clear(&mut self) {
        self.deadline = None;
    }

    /// Checks the deadline on a wake.
    pub fn check(&mut self, now: Instant) -> WatchdogCheck {
        let Some(deadline) = self.deadline else {
            self.wake_scheduled = false;
            return WatchdogCheck::Cleared;
        };
        if now >= deadline {
            self.deadline = None;
            self.wake_scheduled = false;
            WatchdogCheck::Fired
        } else {
            WatchdogCheck::Rescheduled((deadline - now).max(MINIMUM_TICK))
        }
    }

    /// The current deadline, if armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The last time progress was recorded.
    pub fn last_progress(&self) -> Instant {
        self.last_progress
    }

    /// The delay applied on every arm.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}
