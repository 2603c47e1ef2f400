// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prints out harness events in a human-readable form.
//!
//! The main structure in this module is [`PageDisplayer`].

use super::{
    HarnessReporter,
    events::{EventResponse, HarnessEvent, HarnessEventKind, PageStatus, RunStats},
};
use crate::{errors::WriteOutputError, helpers::plural};
use owo_colors::{OwoColorize, Style};
use std::{
    collections::HashMap,
    fmt,
    io::{self, Write},
    time::Duration,
};
use swrite::{SWrite, swrite};
use tracing::warn;

/// Where a [`PageDisplayer`] writes its output.
pub enum ReporterStderr<'a> {
    /// Write to standard error.
    Terminal,

    /// Write output to a buffer.
    Buffer(&'a mut Vec<u8>),
}

/// Builder for a [`PageDisplayer`].
#[derive(Debug, Default)]
pub struct PageDisplayerBuilder {
    should_colorize: bool,
    verbose: bool,
    skip_list: Vec<String>,
}

impl PageDisplayerBuilder {
    /// Sets whether output is colorized.
    pub fn set_colorize(&mut self, should_colorize: bool) -> &mut Self {
        self.should_colorize = should_colorize;
        self
    }

    /// Sets verbose output: every page start and every passing result is printed.
    pub fn set_verbose(&mut self, verbose: bool) -> &mut Self {
        self.verbose = verbose;
        self
    }

    /// Sets the list of URL substrings whose pages are skipped.
    pub fn set_skip_list(&mut self, skip_list: impl IntoIterator<Item = String>) -> &mut Self {
        self.skip_list = skip_list.into_iter().collect();
        self
    }

    /// Creates a new displayer writing to `output`.
    pub fn build<'a>(&self, output: ReporterStderr<'a>) -> PageDisplayer<'a> {
        let mut styles = Styles::default();
        if self.should_colorize {
            styles.colorize();
        }
        PageDisplayer {
            styles,
            verbose: self.verbose,
            skip_list: self.skip_list.clone(),
            output,
            pages: HashMap::new(),
            timed_out: Vec::new(),
            failed: Vec::new(),
            error: None,
        }
    }
}

/// A reporter that displays harness events.
pub struct PageDisplayer<'a> {
    styles: Styles,
    verbose: bool,
    skip_list: Vec<String>,
    output: ReporterStderr<'a>,
    pages: HashMap<String, PageProgress>,
    timed_out: Vec<String>,
    failed: Vec<String>,
    error: Option<io::Error>,
}

#[derive(Debug)]
struct PageProgress {
    started_at: Duration,
    passed: usize,
    failed: usize,
}

impl PageDisplayer<'_> {
    /// Finishes writing, returning the first write error encountered, if any.
    pub fn finish(self) -> Result<(), WriteOutputError> {
        match self.error {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    fn should_skip(&self, url: &str) -> bool {
        self.skip_list.iter().any(|entry| url.contains(entry.as_str()))
    }

    fn write_event(&mut self, event: &HarnessEvent<'_>) -> String {
        let mut out = String::new();
        match &event.kind {
            HarnessEventKind::AddPage { .. } => {}
            HarnessEventKind::Ready { page_count } => {
                swrite!(out, "{:>12} ", "Loaded".style(self.styles.pass));
                swrite!(
                    out,
                    "{} {}\n",
                    page_count.style(self.styles.count),
                    plural::pages_str(*page_count),
                );
            }
            HarnessEventKind::StartPage { url, .. } => {
                self.pages.insert(
                    (*url).to_owned(),
                    PageProgress {
                        started_at: event.elapsed,
                        passed: 0,
                        failed: 0,
                    },
                );
                if self.verbose {
                    swrite!(out, "{:>12} {url}\n", "START".style(self.styles.pass));
                }
            }
            HarnessEventKind::TestResult {
                url,
                success,
                message,
                skipped,
            } => {
                if let Some(progress) = self.pages.get_mut(*url) {
                    if *success {
                        progress.passed += 1;
                    } else {
                        progress.failed += 1;
                    }
                }
                if *skipped {
                    swrite!(out, "{:>12} {url}\n", "SKIP".style(self.styles.skip));
                } else if !*success {
                    swrite!(
                        out,
                        "{:>12} {url}: {message}\n",
                        "FAIL".style(self.styles.fail)
                    );
                } else if self.verbose {
                    swrite!(
                        out,
                        "{:>12} {url}: {message}\n",
                        "PASS".style(self.styles.pass)
                    );
                }
            }
            HarnessEventKind::FinishPage { url, status, .. } => {
                let progress = self.pages.remove(*url);
                let duration = progress
                    .as_ref()
                    .map(|p| event.elapsed.saturating_sub(p.started_at))
                    .unwrap_or_default();
                let failed = progress.as_ref().map_or(0, |p| p.failed);
                let passed = progress.as_ref().map_or(0, |p| p.passed);

                let (label, style) = match status {
                    PageStatus::TimedOut => {
                        self.timed_out.push((*url).to_owned());
                        ("TIMEOUT", self.styles.fail)
                    }
                    PageStatus::Completed if failed > 0 => {
                        self.failed.push((*url).to_owned());
                        ("FAIL", self.styles.fail)
                    }
                    PageStatus::Completed => ("PASS", self.styles.pass),
                };
                swrite!(
                    out,
                    "{:>12} {}{url} ({} passed, {} failed)\n",
                    label.style(style),
                    DisplayBracketedDuration(duration),
                    passed.style(self.styles.count),
                    failed.style(self.styles.count),
                );
            }
            HarnessEventKind::FinishedAllTests { run_stats } => {
                self.write_summary(run_stats, event.elapsed, &mut out);
            }
        }
        out
    }

    fn write_summary(&self, run_stats: &RunStats, elapsed: Duration, out: &mut String) {
        let summary_style = if run_stats.is_success() {
            self.styles.pass
        } else {
            self.styles.fail
        };
        swrite!(out, "{}\n{:>12} ", "-".repeat(12), "Summary".style(summary_style));
        swrite!(out, "{}", DisplayBracketedDuration(elapsed));

        swrite!(out, "{}", run_stats.finished_count.style(self.styles.count));
        if run_stats.finished_count != run_stats.initial_run_count {
            swrite!(out, "/{}", run_stats.initial_run_count.style(self.styles.count));
        }
        swrite!(
            out,
            " {} run: {} {} {}",
            plural::pages_str(run_stats.initial_run_count),
            run_stats.results_passed.style(self.styles.count),
            plural::results_str(run_stats.results_passed),
            "passed".style(self.styles.pass),
        );
        if run_stats.results_failed > 0 {
            swrite!(
                out,
                ", {} {}",
                run_stats.results_failed.style(self.styles.count),
                "failed".style(self.styles.fail),
            );
        }
        if run_stats.timed_out > 0 {
            swrite!(
                out,
                ", {} {}",
                run_stats.timed_out.style(self.styles.count),
                "timed out".style(self.styles.fail),
            );
        }
        if run_stats.skipped > 0 {
            swrite!(
                out,
                ", {} {}",
                run_stats.skipped.style(self.styles.count),
                "skipped".style(self.styles.skip),
            );
        }
        out.push('\n');

        for url in &self.timed_out {
            swrite!(out, "{:>12} {url}\n", "TIMEOUT".style(self.styles.fail));
        }
        for url in &self.failed {
            swrite!(out, "{:>12} {url}\n", "FAIL".style(self.styles.fail));
        }
    }

    fn write_out(&mut self, text: &str) {
        if text.is_empty() || self.error.is_some() {
            return;
        }
        let res = match &mut self.output {
            ReporterStderr::Terminal => {
                let mut stderr = io::stderr().lock();
                stderr.write_all(text.as_bytes()).and_then(|()| stderr.flush())
            }
            ReporterStderr::Buffer(buf) => buf.write_all(text.as_bytes()),
        };
        if let Err(err) = res {
            warn!("error writing harness output: {err}");
            self.error = Some(err);
        }
    }
}

impl HarnessReporter for PageDisplayer<'_> {
    fn report(&mut self, event: HarnessEvent<'_>) -> EventResponse {
        let response = match event.kind {
            HarnessEventKind::StartPage { url, .. } if self.should_skip(url) => {
                EventResponse::SkipPage
            }
            _ => EventResponse::Proceed,
        };
        let text = self.write_event(&event);
        self.write_out(&text);
        response
    }
}

#[derive(Debug, Default)]
struct Styles {
    count: Style,
    pass: Style,
    fail: Style,
    skip: Style,
}

impl Styles {
    fn colorize(&mut self) {
        self.count = Style::new().bold();
        self.pass = Style::new().green().bold();
        self.fail = Style::new().red().bold();
        self.skip = Style::new().yellow().bold();
    }
}

struct DisplayBracketedDuration(Duration);

impl fmt::Display for DisplayBracketedDuration {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // * > means right-align.
        // * 8 is the number of characters to pad to.
        // * .3 means print three digits after the decimal point.
        write!(f, "[{:>8.3?}s] ", self.0.as_secs_f64())
    }
}
