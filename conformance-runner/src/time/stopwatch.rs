// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stopwatch for tracking how long a run takes.
//!
//! Events carry both a wall-clock timestamp and the time elapsed since the run started. For that we
//! use a combination of a `DateTime` (realtime clock) and an `Instant` (monotonic clock). The
//! monotonic clock is tokio's, so tests that pause time see deterministic elapsed durations.

use chrono::{DateTime, FixedOffset, Local};
use std::time::Duration;
use tokio::time::Instant;

pub(crate) fn stopwatch() -> StopwatchStart {
    StopwatchStart::new()
}

/// The start state of a stopwatch.
#[derive(Clone, Debug)]
pub(crate) struct StopwatchStart {
    start_time: DateTime<Local>,
    instant: Instant,
}

impl StopwatchStart {
    fn new() -> Self {
        Self {
            // These two calls will happen imperceptibly close to each other, which is good enough
            // for our purposes.
            start_time: Local::now(),
            instant: Instant::now(),
        }
    }

    pub(crate) fn snapshot(&self) -> StopwatchSnapshot {
        StopwatchSnapshot {
            start_time: self.start_time,
            duration: self.instant.elapsed(),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct StopwatchSnapshot {
    pub(crate) start_time: DateTime<Local>,
    pub(crate) duration: Duration,
}

impl StopwatchSnapshot {
    /// The wall-clock time at which this snapshot was taken.
    pub(crate) fn end_time(&self) -> DateTime<FixedOffset> {
        (self.start_time + self.duration).fixed_offset()
    }
}
