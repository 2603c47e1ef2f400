// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{ExecutionSlot, PageLoad};
use crate::runner::HarnessHandle;
use camino::Utf8PathBuf;
use regex::Regex;
use serde::Deserialize;
use std::{process::Stdio, sync::LazyLock};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::Command,
    task::JoinHandle,
};
use tracing::{debug, warn};

/// The placeholder replaced by the page location in command arguments.
pub const URL_PLACEHOLDER: &str = "{url}";

/// A command that runs a single page.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct CommandTemplate {
    /// The program to run.
    pub program: String,

    /// Arguments to the program. Every `{url}` is replaced by the page location. If no argument
    /// contains `{url}`, the location is appended as the last argument.
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandTemplate {
    /// Creates a new template.
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = String>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().collect(),
        }
    }

    /// Returns the arguments for loading `location`.
    pub fn render_args(&self, location: &str) -> Vec<String> {
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| arg.replace(URL_PLACEHOLDER, location))
            .collect();
        if !self.args.iter().any(|arg| arg.contains(URL_PLACEHOLDER)) {
            args.push(location.to_owned());
        }
        args
    }
}

/// An execution slot that runs an external command per page.
///
/// Every line the command prints to stdout containing the word `PASS` or `FAIL` becomes a result,
/// with the rest of the line as its message. When the command exits, the page is finished.
#[derive(Debug)]
pub struct CommandSlot {
    id: usize,
    template: CommandTemplate,
    cwd: Option<Utf8PathBuf>,
    task: Option<JoinHandle<()>>,
}

impl CommandSlot {
    /// Creates a new slot running `template`.
    pub fn new(id: usize, template: CommandTemplate) -> Self {
        Self {
            id,
            template,
            cwd: None,
            task: None,
        }
    }

    /// Sets the working directory commands run in.
    pub fn set_cwd(&mut self, cwd: impl Into<Utf8PathBuf>) -> &mut Self {
        self.cwd = Some(cwd.into());
        self
    }
}

impl ExecutionSlot for CommandSlot {
    fn load(&mut self, page: PageLoad, handle: HarnessHandle) {
        if let Some(task) = self.task.take() {
            // Dropping the task's child process kills it.
            task.abort();
        }

        let mut command = Command::new(&self.template.program);
        command
            .args(self.template.render_args(&page.location))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }

        self.task = Some(tokio::spawn(run_page(self.id, command, page.url, handle)));
    }
}

impl Drop for CommandSlot {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run_page(slot: usize, mut command: Command, url: String, handle: HarnessHandle) {
    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(err) => {
            warn!(slot, %url, "failed to spawn page command: {err}");
            if let Err(err) = handle
                .report_result(&url, false, format!("failed to spawn command: {err}"))
                .await
            {
                debug!(slot, %url, "result not recorded: {err}");
            }
            finish(slot, &url, &handle).await;
            return;
        }
    };

    if let Some(stdout) = child.stdout.take() {
        let mut lines = BufReader::new(stdout).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let Some((success, message)) = parse_result_line(&line) else {
                        continue;
                    };
                    if let Err(err) = handle.report_result(&url, success, message).await {
                        debug!(slot, %url, "result not recorded: {err}");
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    warn!(slot, %url, "error reading page output: {err}");
                    break;
                }
            }
        }
    }

    match child.wait().await {
        Ok(status) => debug!(slot, %url, %status, "page command exited"),
        Err(err) => warn!(slot, %url, "error waiting for page command: {err}"),
    }
    finish(slot, &url, &handle).await;
}

async fn finish(slot: usize, url: &str, handle: &HarnessHandle) {
    if let Err(err) = handle.notify_finished(url).await {
        // The page most likely timed out already.
        debug!(slot, %url, "finish not recorded: {err}");
    }
}

static RESULT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(PASS|FAIL)\b").expect("result regex is valid")
});

/// Parses a line of page output into a result.
///
/// Returns the success value and the message: the rest of the line after the first `PASS` or
/// `FAIL`, with surrounding whitespace and a leading `:` removed.
pub fn parse_result_line(line: &str) -> Option<(bool, &str)> {
    let captures = RESULT_REGEX.captures(line)?;
    let word = captures.get(1)?;
    let message = line[word.end()..].trim_start();
    let message = message.strip_prefix(':').unwrap_or(message).trim();
    Some((word.as_str() == "PASS", message))
}
