// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The synchronous core of a test run.
//!
//! The scheduler owns all run state and never waits on anything. Timers are requested through
//! [`TestScheduler::take_wake_requests`] and delivered back through
//! [`TestScheduler::on_watchdog_wake`], which lets the async driver in `harness.rs` own every
//! await point.

use super::{HarnessHandle, RunSettings};
use crate::{
    errors::UnknownTestError,
    list::TestFile,
    reporter::{
        HarnessReporter,
        events::{EventResponse, HarnessEvent, HarnessEventKind, PageStatus, RunStats},
    },
    slot::{ExecutionSlot, PageLoad},
    time::{StopwatchStart, stopwatch},
    watchdog::{Watchdog, WatchdogArm, WatchdogCheck},
};
use std::{
    collections::{HashMap, VecDeque},
    mem,
    ops::Range,
    time::Duration,
};
use tokio::time::Instant;
use tracing::{debug, trace};

type SlotId = usize;

/// Identifies the watchdog of one dispatch of a page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct WatchdogWake {
    pub(crate) url: String,
    pub(crate) run_id: u64,
}

/// A request to call [`TestScheduler::on_watchdog_wake`] after a delay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct WakeRequest {
    pub(crate) wake: WatchdogWake,
    pub(crate) delay: Duration,
}

impl WakeRequest {
    pub(crate) async fn sleep(self) -> WatchdogWake {
        tokio::time::sleep(self.delay).await;
        self.wake
    }
}

#[derive(Debug)]
struct RunningTest {
    slot: SlotId,
    run_id: u64,
    watchdog: Watchdog,
}

pub(crate) struct TestScheduler<'a, S> {
    files: &'a [TestFile],
    slots: Vec<S>,
    idle: VecDeque<SlotId>,
    queue: VecDeque<usize>,
    running: HashMap<String, RunningTest>,
    remaining: usize,
    settings: RunSettings,
    handle: HarnessHandle,
    stopwatch: StopwatchStart,
    stats: RunStats,
    next_run_id: u64,
    wake_requests: Vec<WakeRequest>,
    finished: bool,
}

impl<'a, S: ExecutionSlot> TestScheduler<'a, S> {
    pub(crate) fn new(
        files: &'a [TestFile],
        range: Range<usize>,
        slots: Vec<S>,
        settings: RunSettings,
        handle: HarnessHandle,
    ) -> Self {
        let remaining = range.len();
        Self {
            files,
            idle: (0..slots.len()).collect(),
            slots,
            queue: range.collect(),
            running: HashMap::new(),
            remaining,
            settings,
            handle,
            stopwatch: stopwatch(),
            stats: RunStats {
                initial_run_count: remaining,
                ..RunStats::default()
            },
            next_run_id: 0,
            wake_requests: Vec::new(),
            finished: false,
        }
    }

    /// Starts the run by dispatching pages to every idle slot.
    pub(crate) fn start<R: HarnessReporter>(&mut self, reporter: &mut R) {
        debug!(
            pages = self.remaining,
            slots = self.slots.len(),
            "starting test run"
        );
        self.dispatch(reporter);
    }

    /// Records a result for a running page and extends its watchdog.
    ///
    /// If `run_id` is set, the result must come from that dispatch of the page.
    pub(crate) fn report_result<R: HarnessReporter>(
        &mut self,
        url: &str,
        run_id: Option<u64>,
        success: bool,
        message: &str,
        reporter: &mut R,
    ) -> Result<(), UnknownTestError> {
        let url = self.settings.normalize_url(url);
        let running = self.running_mut(url, run_id)?;
        let current = running.run_id;
        if let WatchdogArm::Started(delay) = running.watchdog.arm(Instant::now()) {
            self.wake_requests.push(WakeRequest {
                wake: WatchdogWake {
                    url: url.to_owned(),
                    run_id: current,
                },
                delay,
            });
        }

        self.stats.on_result(success);
        reporter.report(self.event(HarnessEventKind::TestResult {
            url,
            success,
            message,
            skipped: false,
        }));
        Ok(())
    }

    /// Ends a running page normally, then dispatches more pages.
    ///
    /// If `run_id` is set, the notification must come from that dispatch of the page.
    pub(crate) fn notify_finished<R: HarnessReporter>(
        &mut self,
        url: &str,
        run_id: Option<u64>,
        reporter: &mut R,
    ) -> Result<(), UnknownTestError> {
        let url = self.settings.normalize_url(url);
        self.running_mut(url, run_id)?;
        self.finish(url, PageStatus::Completed, reporter)?;
        self.dispatch(reporter);
        Ok(())
    }

    /// Handles a watchdog wake requested earlier.
    ///
    /// Wakes for pages that have already finished, or for an earlier dispatch of the same URL, are
    /// ignored.
    pub(crate) fn on_watchdog_wake<R: HarnessReporter>(
        &mut self,
        wake: WatchdogWake,
        reporter: &mut R,
    ) {
        let Some(running) = self
            .running
            .get_mut(&wake.url)
            .filter(|running| running.run_id == wake.run_id)
        else {
            trace!(url = %wake.url, run_id = wake.run_id, "ignoring stale watchdog wake");
            return;
        };

        match running.watchdog.check(Instant::now()) {
            WatchdogCheck::Cleared => {}
            WatchdogCheck::Fired => {
                debug!(
                    url = %wake.url,
                    run_id = wake.run_id,
                    since_progress = ?running.watchdog.last_progress().elapsed(),
                    delay = ?running.watchdog.delay(),
                    "page timed out"
                );
                if self
                    .finish(&wake.url, PageStatus::TimedOut, reporter)
                    .is_ok()
                {
                    self.dispatch(reporter);
                }
            }
            WatchdogCheck::Rescheduled(delay) => {
                trace!(url = %wake.url, ?delay, "watchdog rescheduled");
                self.wake_requests.push(WakeRequest { wake, delay });
            }
        }
    }

    /// Returns and clears the wakes requested since the last call.
    pub(crate) fn take_wake_requests(&mut self) -> Vec<WakeRequest> {
        mem::take(&mut self.wake_requests)
    }

    /// Returns true once `FinishedAllTests` has been emitted.
    pub(crate) fn is_finished(&self) -> bool {
        self.finished
    }

    pub(crate) fn run_stats(&self) -> RunStats {
        self.stats
    }

    #[cfg(test)]
    fn running_count(&self) -> usize {
        self.running.len()
    }

    fn running_mut(
        &mut self,
        url: &str,
        run_id: Option<u64>,
    ) -> Result<&mut RunningTest, UnknownTestError> {
        match self.running.get_mut(url) {
            Some(running) if run_id.is_none_or(|id| id == running.run_id) => Ok(running),
            Some(running) => {
                // A message from an earlier dispatch of a URL that is listed more than once.
                debug!(url, ?run_id, current = running.run_id, "rejecting stale page message");
                Err(UnknownTestError::new(url))
            }
            None => Err(UnknownTestError::new(url)),
        }
    }

    fn dispatch<R: HarnessReporter>(&mut self, reporter: &mut R) {
        let files = self.files;
        while let Some(&index) = self.queue.front() {
            if self.idle.is_empty() {
                break;
            }
            let url = files[index].url();
            if self.running.contains_key(url) {
                // The same URL is listed twice. Keep FIFO order and wait for the earlier one.
                debug!(url, "waiting for earlier instance of page to finish");
                break;
            }
            let Some(slot) = self.idle.pop_front() else {
                break;
            };
            self.queue.pop_front();
            self.start_test(url, slot, reporter);
        }

        if self.remaining == 0 && !self.finished {
            self.finished = true;
            debug!(stats = ?self.stats, "all pages finished");
            reporter.report(self.event(HarnessEventKind::FinishedAllTests {
                run_stats: self.stats,
            }));
        }
    }

    fn start_test<R: HarnessReporter>(&mut self, url: &'a str, slot: SlotId, reporter: &mut R) {
        let run_id = self.next_run_id;
        self.next_run_id += 1;
        self.running.insert(
            url.to_owned(),
            RunningTest {
                slot,
                run_id,
                watchdog: Watchdog::new(self.settings.timeout_delay, Instant::now()),
            },
        );
        self.stats.started += 1;

        let response = reporter.report(self.event(HarnessEventKind::StartPage {
            url,
            running: self.running.len(),
        }));

        match response {
            EventResponse::SkipPage => {
                debug!(url, "skipping page");
                let success = self.settings.allow_skip;
                self.stats.skipped += 1;
                self.stats.on_result(success);
                reporter.report(self.event(HarnessEventKind::TestResult {
                    url,
                    success,
                    message: "skipped",
                    skipped: true,
                }));
                // The page was just inserted, so this can't fail.
                _ = self.finish(url, PageStatus::Completed, reporter);
            }
            EventResponse::Proceed => {
                let page = PageLoad {
                    url: url.to_owned(),
                    location: self.settings.page_location(url),
                };
                trace!(url, slot, location = %page.location, "loading page");
                self.slots[slot].load(page, self.handle.for_run(run_id));

                if let Some(running) = self.running.get_mut(url)
                    && let WatchdogArm::Started(delay) = running.watchdog.arm(Instant::now())
                {
                    self.wake_requests.push(WakeRequest {
                        wake: WatchdogWake {
                            url: url.to_owned(),
                            run_id,
                        },
                        delay,
                    });
                }
            }
        }
    }

    fn finish<R: HarnessReporter>(
        &mut self,
        url: &str,
        status: PageStatus,
        reporter: &mut R,
    ) -> Result<(), UnknownTestError> {
        let Some(mut running) = self.running.remove(url) else {
            return Err(UnknownTestError::new(url));
        };
        running.watchdog.clear();
        self.idle.push_back(running.slot);
        self.remaining -= 1;
        self.stats.on_finish(status);

        reporter.report(self.event(HarnessEventKind::FinishPage {
            url,
            status,
            running: self.running.len(),
        }));
        Ok(())
    }

    fn event<'e>(&self, kind: HarnessEventKind<'e>) -> HarnessEvent<'e> {
        HarnessEvent::new(self.stopwatch.snapshot(), kind)
    }
}
