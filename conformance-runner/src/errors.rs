// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by the conformance runner.

use camino::Utf8PathBuf;
use config::ConfigError;
use std::{error::Error, fmt};
use thiserror::Error;

/// The error type returned by a [`TextFetcher`](crate::fetch::TextFetcher).
pub type FetchError = Box<dyn Error + Send + Sync + 'static>;

/// An error that occurred while parsing a line of a manifest.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{kind} in `{manifest}` at line {line}: `{token}`")]
pub struct ManifestParseError {
    manifest: String,
    line: usize,
    token: String,
    kind: ManifestParseErrorKind,
}

impl ManifestParseError {
    pub(crate) fn new(
        manifest: impl Into<String>,
        line: usize,
        token: impl Into<String>,
        kind: ManifestParseErrorKind,
    ) -> Self {
        Self {
            manifest: manifest.into(),
            line,
            token: token.into(),
            kind,
        }
    }

    /// The manifest that contained the offending line.
    pub fn manifest(&self) -> &str {
        &self.manifest
    }

    /// The 1-based line number of the offending line.
    pub fn line(&self) -> usize {
        self.line
    }

    /// The token that could not be parsed.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The kind of parse error.
    pub fn kind(&self) -> &ManifestParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while parsing a manifest line.
///
/// Forms part of [`ManifestParseError`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ManifestParseErrorKind {
    /// A token started with a single `-`.
    BadOption,

    /// A `--` option that isn't known.
    UnknownOption {
        /// The option name, without the leading `--`.
        option: String,
    },

    /// An option that takes an argument was the last token on its line.
    MissingOptionArgument {
        /// The option name, without the leading `--`.
        option: String,
    },
}

impl fmt::Display for ManifestParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadOption => write!(f, "bad option"),
            Self::UnknownOption { option } => write!(f, "unknown option `{option}`"),
            Self::MissingOptionArgument { option } => {
                write!(f, "option `{option}` requires an argument")
            }
        }
    }
}

/// A manifest could not be fetched.
#[derive(Debug, Error)]
#[error("failed to load manifest `{url}`")]
pub struct ManifestFetchError {
    url: String,
    #[source]
    err: FetchError,
}

impl ManifestFetchError {
    pub(crate) fn new(url: impl Into<String>, err: FetchError) -> Self {
        Self {
            url: url.into(),
            err,
        }
    }

    /// The URL of the manifest that failed to load.
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// An error that occurred while resolving a manifest tree into a list of tests.
///
/// Resolution is all-or-nothing: any error discards every test resolved so far.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A manifest line could not be parsed.
    #[error(transparent)]
    Parse(#[from] ManifestParseError),

    /// A manifest could not be fetched.
    #[error(transparent)]
    Fetch(#[from] ManifestFetchError),
}

/// A result or finish notification referred to a URL that isn't currently running.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown test: `{url}` is not currently running")]
pub struct UnknownTestError {
    url: String,
}

impl UnknownTestError {
    pub(crate) fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// The URL that was reported.
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// An error returned by a [`HarnessHandle`](crate::runner::HarnessHandle) operation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum HarnessHandleError {
    /// The notification referred to a test that isn't running.
    #[error(transparent)]
    UnknownTest(#[from] UnknownTestError),

    /// The run this handle belongs to has already ended.
    #[error("the test run has ended")]
    HarnessClosed,
}

/// The requested run range doesn't fit in the test list.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("run range {start}..{end} is out of bounds for {len} tests")]
pub struct RunRangeError {
    start: usize,
    end: usize,
    len: usize,
}

impl RunRangeError {
    pub(crate) fn new(start: usize, end: usize, len: usize) -> Self {
        Self { start, end, len }
    }
}

/// An error that prevented a test run from starting.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RunTestsError {
    /// The run range is invalid.
    #[error(transparent)]
    InvalidRange(#[from] RunRangeError),

    /// Tests were selected but no execution slots were provided.
    #[error("{count} tests selected but no execution slots were provided")]
    NoSlots {
        /// The number of tests that would have run.
        count: usize,
    },
}

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse conformance config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }

    /// Returns the kind of error this is.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while parsing a config.
///
/// Returned by [`ConfigParseError::kind`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),
}

/// An error which indicates that a profile was requested but not known.
#[derive(Clone, Debug, Error)]
#[error("profile `{profile}` not found (known profiles: {})", .all_profiles.join(", "))]
pub struct ProfileNotFound {
    profile: String,
    all_profiles: Vec<String>,
}

impl ProfileNotFound {
    pub(crate) fn new(
        profile: impl Into<String>,
        all_profiles: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let mut all_profiles: Vec<_> = all_profiles.into_iter().map(|s| s.into()).collect();
        all_profiles.sort_unstable();
        Self {
            profile: profile.into(),
            all_profiles,
        }
    }
}

/// An error that occurred while writing a reporter event or a list.
#[derive(Debug, Error)]
#[error("error writing output")]
pub struct WriteOutputError {
    #[from]
    err: std::io::Error,
}
