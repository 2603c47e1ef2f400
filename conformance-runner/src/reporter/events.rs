// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Events emitted by the test harness.
//!
//! These types are part of the public interface: the harness doesn't have any other way to report
//! what happened.

use crate::time::StopwatchSnapshot;
use chrono::{DateTime, FixedOffset};
use std::time::Duration;

/// A harness event.
///
/// Events are produced by the [`TestHarnessBuilder`](crate::runner::TestHarnessBuilder) and the
/// [`TestHarness`](crate::runner::TestHarness), and consumed by a
/// [`HarnessReporter`](super::HarnessReporter).
#[derive(Clone, Debug)]
pub struct HarnessEvent<'a> {
    /// The time at which the event was generated.
    pub timestamp: DateTime<FixedOffset>,

    /// The amount of time elapsed since the start of the harness (for build events) or the test
    /// run (for run events).
    pub elapsed: Duration,

    /// The kind of event this is.
    pub kind: HarnessEventKind<'a>,
}

impl<'a> HarnessEvent<'a> {
    pub(crate) fn new(snapshot: StopwatchSnapshot, kind: HarnessEventKind<'a>) -> Self {
        Self {
            timestamp: snapshot.end_time(),
            elapsed: snapshot.duration,
            kind,
        }
    }
}

/// The kind of harness event this is.
///
/// Forms part of [`HarnessEvent`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HarnessEventKind<'a> {
    /// A test page was added to the list. Emitted once per page, in list order.
    AddPage {
        /// The index of the page in the list.
        index: usize,

        /// The URL of the page.
        url: &'a str,
    },

    /// Every page has been added.
    Ready {
        /// The number of pages in the list.
        page_count: usize,
    },

    /// A page is about to start.
    ///
    /// A reporter may answer this event with [`EventResponse::SkipPage`] to skip the page.
    StartPage {
        /// The URL of the page.
        url: &'a str,

        /// The number of pages currently running, including this one.
        running: usize,
    },

    /// A page reported a result.
    TestResult {
        /// The URL of the page.
        url: &'a str,

        /// Whether the result was a success.
        success: bool,

        /// The message reported with the result.
        message: &'a str,

        /// True if this result was synthesized because the page was skipped.
        skipped: bool,
    },

    /// A page reached its terminal state.
    FinishPage {
        /// The URL of the page.
        url: &'a str,

        /// How the page finished.
        status: PageStatus,

        /// The number of pages still running after this one.
        running: usize,
    },

    /// Every page in the run has finished. Emitted exactly once per run.
    FinishedAllTests {
        /// Statistics for the run.
        run_stats: RunStats,
    },
}

/// The response of a reporter to an event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EventResponse {
    /// Carry on.
    #[default]
    Proceed,

    /// Skip the page instead of loading it. Only honored for
    /// [`HarnessEventKind::StartPage`].
    SkipPage,
}

/// How a page finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageStatus {
    /// The page notified the harness that it was done, or was skipped.
    Completed,

    /// The page made no progress for the timeout delay.
    TimedOut,
}

impl PageStatus {
    /// Returns the success value for this status: `Some(true)` for a completed page, and `None` for
    /// a page that timed out.
    ///
    /// A timeout doesn't say anything about whether the page's tests passed, so it has no success
    /// value.
    pub fn success(self) -> Option<bool> {
        match self {
            Self::Completed => Some(true),
            Self::TimedOut => None,
        }
    }
}

/// Statistics for a test run.
#[derive(Copy, Clone, Default, Debug, Eq, PartialEq)]
pub struct RunStats {
    /// The total number of pages that were expected to run at the beginning.
    pub initial_run_count: usize,

    /// The number of pages that were started, including skipped pages.
    pub started: usize,

    /// The number of pages that reached their terminal state.
    pub finished_count: usize,

    /// The number of pages that completed normally, including skipped pages.
    pub completed: usize,

    /// The number of pages that timed out.
    pub timed_out: usize,

    /// The number of pages that were skipped by the reporter.
    pub skipped: usize,

    /// The number of results that reported success.
    pub results_passed: usize,

    /// The number of results that reported failure.
    ///
    /// This includes the results of skipped pages if skipping isn't allowed.
    pub results_failed: usize,
}

impl RunStats {
    /// Returns true if no page timed out and no result failed.
    pub fn is_success(&self) -> bool {
        self.timed_out == 0 && self.results_failed == 0
    }

    /// Returns true if every page that was expected to run reached its terminal state.
    pub fn is_complete(&self) -> bool {
        self.finished_count == self.initial_run_count
    }

    pub(crate) fn on_result(&mut self, success: bool) {
        if success {
            self.results_passed += 1;
        } else {
            self.results_failed += 1;
        }
    }

    pub(crate) fn on_finish(&mut self, status: PageStatus) {
        self.finished_count += 1;
        match status {
            PageStatus::Completed => self.completed += 1,
            PageStatus::TimedOut => self.timed_out += 1,
        }
    }
}
