// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use conformance_runner::{
    reporter::{
        HarnessReporter,
        events::{EventResponse, HarnessEvent, HarnessEventKind, PageStatus, RunStats},
    },
    runner::HarnessHandle,
    slot::{ExecutionSlot, PageLoad},
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::task::JoinHandle;

/// An owned copy of a harness event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Recorded {
    Add(usize, String),
    Ready(usize),
    Start(String),
    Result {
        url: String,
        success: bool,
        skipped: bool,
    },
    Finish(String, PageStatus),
    FinishedAll(RunStats),
}

impl Recorded {
    pub fn start(url: &str) -> Self {
        Self::Start(url.to_owned())
    }

    pub fn passed(url: &str) -> Self {
        Self::Result {
            url: url.to_owned(),
            success: true,
            skipped: false,
        }
    }

    pub fn completed(url: &str) -> Self {
        Self::Finish(url.to_owned(), PageStatus::Completed)
    }

    pub fn timed_out(url: &str) -> Self {
        Self::Finish(url.to_owned(), PageStatus::TimedOut)
    }
}

/// A reporter that records every event along with the time it was reported at.
#[derive(Debug, Default)]
pub struct EventLog {
    pub events: Vec<(Duration, Recorded)>,
    pub skip: Vec<String>,
}

impl EventLog {
    pub fn with_skip_list(skip: &[&str]) -> Self {
        Self {
            events: Vec::new(),
            skip: skip.iter().map(|url| (*url).to_owned()).collect(),
        }
    }

    pub fn kinds(&self) -> Vec<Recorded> {
        self.events.iter().map(|(_, kind)| kind.clone()).collect()
    }

    /// Returns the time `expected` was reported at.
    #[track_caller]
    pub fn elapsed_at(&self, expected: &Recorded) -> Duration {
        self.events
            .iter()
            .find(|(_, kind)| kind == expected)
            .map(|(elapsed, _)| *elapsed)
            .unwrap_or_else(|| panic!("{expected:?} was not reported"))
    }

    pub fn finished_all_count(&self) -> usize {
        self.events
            .iter()
            .filter(|(_, kind)| matches!(kind, Recorded::FinishedAll(_)))
            .count()
    }
}

impl HarnessReporter for EventLog {
    fn report(&mut self, event: HarnessEvent<'_>) -> EventResponse {
        let mut response = EventResponse::Proceed;
        let recorded = match event.kind {
            HarnessEventKind::AddPage { index, url } => Recorded::Add(index, url.to_owned()),
            HarnessEventKind::Ready { page_count } => Recorded::Ready(page_count),
            HarnessEventKind::StartPage { url, .. } => {
                if self.skip.iter().any(|skip| skip == url) {
                    response = EventResponse::SkipPage;
                }
                Recorded::Start(url.to_owned())
            }
            HarnessEventKind::TestResult {
                url,
                success,
                skipped,
                ..
            } => Recorded::Result {
                url: url.to_owned(),
                success,
                skipped,
            },
            HarnessEventKind::FinishPage { url, status, .. } => {
                Recorded::Finish(url.to_owned(), status)
            }
            HarnessEventKind::FinishedAllTests { run_stats } => Recorded::FinishedAll(run_stats),
        };
        self.events.push((event.elapsed, recorded));
        response
    }
}

/// A step a scripted page takes.
#[derive(Clone, Debug)]
pub enum Step {
    Sleep(Duration),
    Report(bool),
    Finish,
}

impl Step {
    pub fn sleep_ms(ms: u64) -> Self {
        Self::Sleep(Duration::from_millis(ms))
    }
}

/// Scripts for pages, keyed by URL. Pages without a script never report anything.
#[derive(Clone, Debug, Default)]
pub struct Script {
    steps: Arc<HashMap<String, Vec<Step>>>,
    loads: Arc<Mutex<Vec<PageLoad>>>,
    rejected: Arc<Mutex<Vec<String>>>,
}

impl Script {
    pub fn new<'a>(steps: impl IntoIterator<Item = (&'a str, Vec<Step>)>) -> Self {
        Self {
            steps: Arc::new(
                steps
                    .into_iter()
                    .map(|(url, steps)| (url.to_owned(), steps))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    /// A script where every page sleeps for `ms`, passes once and finishes.
    pub fn passing<'a>(pages: impl IntoIterator<Item = (&'a str, u64)>) -> Self {
        Self::new(pages.into_iter().map(|(url, ms)| {
            (
                url,
                vec![Step::sleep_ms(ms), Step::Report(true), Step::Finish],
            )
        }))
    }

    pub fn slots(&self, count: usize) -> Vec<ScriptedSlot> {
        (0..count)
            .map(|_| ScriptedSlot {
                script: self.clone(),
                task: None,
            })
            .collect()
    }

    /// The pages loaded so far, across all slots.
    pub fn loads(&self) -> Vec<PageLoad> {
        self.loads.lock().unwrap().clone()
    }

    /// The errors the harness returned to pages.
    pub fn rejected(&self) -> Vec<String> {
        self.rejected.lock().unwrap().clone()
    }
}

/// An execution slot that plays back a [`Script`] on a tokio task.
#[derive(Debug)]
pub struct ScriptedSlot {
    script: Script,
    task: Option<JoinHandle<()>>,
}

impl ExecutionSlot for ScriptedSlot {
    fn load(&mut self, page: PageLoad, handle: HarnessHandle) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.script.loads.lock().unwrap().push(page.clone());

        let steps = self
            .script
            .steps
            .get(&page.url)
            .cloned()
            .unwrap_or_default();
        let rejected = self.script.rejected.clone();
        let url = page.url;
        self.task = Some(tokio::spawn(async move {
            for step in steps {
                let res = match step {
                    Step::Sleep(duration) => {
                        tokio::time::sleep(duration).await;
                        Ok(())
                    }
                    Step::Report(success) => {
                        let message = if success { "ok" } else { "mismatch" };
                        handle.report_result(url.as_str(), success, message).await
                    }
                    Step::Finish => handle.notify_finished(url.as_str()).await,
                };
                if let Err(error) = res {
                    rejected.lock().unwrap().push(error.to_string());
                }
            }
        }));
    }
}

impl Drop for ScriptedSlot {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
