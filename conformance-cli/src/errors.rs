// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use camino::Utf8PathBuf;
use conformance_runner::errors::*;
use owo_colors::OwoColorize;
use std::error::Error;
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

/// Documented exit codes for `conformance` failures.
///
/// Unknown or unexpected failures always result in exit code 1.
pub enum ConformanceExitCode {}

impl ConformanceExitCode {
    /// No errors occurred and every page passed.
    pub const OK: i32 = 0;

    /// No tests were selected to run, but no other errors occurred.
    pub const NO_TESTS_RUN: i32 = 4;

    /// A user issue happened while setting up a run.
    pub const SETUP_ERROR: i32 = 96;

    /// One or more pages failed or timed out.
    pub const TEST_RUN_FAILED: i32 = 100;

    /// Writing data to stdout or stderr produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}

// The #[error()] strings are placeholders: errors are printed with display_to_stderr, which adds
// color and the chain of causes.

/// An expected failure of a `conformance` invocation.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("could not determine the current directory")]
    CurrentDirFailed {
        #[source]
        err: std::io::Error,
    },
    #[error("current directory is not valid UTF-8")]
    CurrentDirInvalidUtf8 { path: std::path::PathBuf },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("profile not found")]
    ProfileNotFound {
        #[from]
        err: ProfileNotFound,
    },
    #[error("failed to start the async runtime")]
    RuntimeBuildFailed {
        #[source]
        err: std::io::Error,
    },
    #[error("unable to load tests")]
    LoadTestsFailed {
        root: String,
        base_dir: Utf8PathBuf,
        #[source]
        err: ResolveError,
    },
    #[error("no command configured")]
    NoCommand { profile: String },
    #[error("failed to start test run")]
    RunTestsFailed {
        #[from]
        err: RunTestsError,
    },
    #[error("error writing output")]
    WriteOutputError {
        #[from]
        err: WriteOutputError,
    },
    #[error("no tests to run")]
    NoTestsRun,
    #[error("test run failed")]
    TestRunFailed,
}

impl ExpectedError {
    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CurrentDirFailed { .. }
            | Self::CurrentDirInvalidUtf8 { .. }
            | Self::ConfigParseError { .. }
            | Self::ProfileNotFound { .. }
            | Self::RuntimeBuildFailed { .. }
            | Self::LoadTestsFailed { .. }
            | Self::NoCommand { .. }
            | Self::RunTestsFailed { .. } => ConformanceExitCode::SETUP_ERROR,
            Self::WriteOutputError { .. } => ConformanceExitCode::WRITE_OUTPUT_ERROR,
            Self::NoTestsRun => ConformanceExitCode::NO_TESTS_RUN,
            Self::TestRunFailed => ConformanceExitCode::TEST_RUN_FAILED,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match self {
            Self::CurrentDirFailed { err } => {
                error!("could not determine the current directory");
                Some(err as &dyn Error)
            }
            Self::CurrentDirInvalidUtf8 { path } => {
                error!("current directory `{}` is not valid UTF-8", path.display());
                None
            }
            Self::ConfigParseError { err } => {
                error!(
                    "failed to parse config at `{}`",
                    err.config_file().style(styles.bold)
                );
                Some(err.kind() as &dyn Error)
            }
            Self::ProfileNotFound { err } => {
                error!("{err}");
                err.source()
            }
            Self::RuntimeBuildFailed { err } => {
                error!("failed to start the async runtime");
                Some(err as &dyn Error)
            }
            Self::LoadTestsFailed {
                root,
                base_dir,
                err,
            } => {
                error!(
                    "unable to load tests from `{}` in `{}`",
                    root.style(styles.bold),
                    base_dir.style(styles.bold),
                );
                Some(err as &dyn Error)
            }
            Self::NoCommand { profile } => {
                error!(
                    "no command configured to run pages with: set `[profile.{}.command]` \
                     or pass `--command`",
                    profile.style(styles.bold),
                );
                None
            }
            Self::RunTestsFailed { err } => {
                error!("failed to start test run");
                Some(err as &dyn Error)
            }
            Self::WriteOutputError { err } => {
                error!("error writing output");
                err.source()
            }
            Self::NoTestsRun => {
                error!("no tests to run");
                None
            }
            Self::TestRunFailed => {
                error!("test run failed");
                None
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
