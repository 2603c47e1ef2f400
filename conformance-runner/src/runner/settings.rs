// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    errors::RunRangeError, helpers::url_with_query, version::major_version,
    watchdog::DEFAULT_TIMEOUT_DELAY,
};
use std::{ops::Range, time::Duration};

/// Settings that control how pages are run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSettings {
    /// How long a page may go without progress before it times out.
    pub timeout_delay: Duration,

    /// The success value reported for skipped pages.
    pub allow_skip: bool,

    /// The major version passed to every page as `webglVersion`.
    pub major_version: u32,

    /// If set, passed to every page as `dumpShaders`.
    pub dump_shaders: Option<bool>,

    /// If set, passed to every page as `quiet`.
    pub quiet: Option<bool>,

    /// A prefix stripped from URLs reported by pages.
    ///
    /// Pages report their own location, which may be absolute. Stripping this prefix maps it back
    /// to the URL in the test list.
    pub url_prefix: Option<String>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            timeout_delay: DEFAULT_TIMEOUT_DELAY,
            allow_skip: false,
            major_version: 1,
            dump_shaders: None,
            quiet: None,
            url_prefix: None,
        }
    }
}

impl RunSettings {
    /// Returns the default settings for testing `version`.
    pub fn for_version(version: &str) -> Self {
        Self {
            major_version: major_version(Some(version)),
            ..Self::default()
        }
    }

    /// Returns the location a page should be loaded from.
    pub fn page_location(&self, url: &str) -> String {
        let mut params = vec![("webglVersion", self.major_version.to_string())];
        if let Some(dump_shaders) = self.dump_shaders {
            params.push(("dumpShaders", dump_shaders.to_string()));
        }
        if let Some(quiet) = self.quiet {
            params.push(("quiet", quiet.to_string()));
        }
        url_with_query(url, params)
    }

    /// Maps a URL reported by a page back to its URL in the test list.
    pub fn normalize_url<'a>(&self, url: &'a str) -> &'a str {
        match self.url_prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => url.strip_prefix(prefix).unwrap_or(url),
            _ => url,
        }
    }
}

/// The part of the test list to run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunRange {
    /// The index of the first test to run.
    pub start: usize,

    /// The number of tests to run, or `None` to run every test from `start` onwards.
    pub count: Option<usize>,
}

impl RunRange {
    /// Returns a range covering the whole list.
    pub fn all() -> Self {
        Self::default()
    }

    /// Resolves this range against a list of `len` tests.
    pub fn resolve(&self, len: usize) -> Result<Range<usize>, RunRangeError> {
        let end = match self.count {
            Some(count) => self.start.saturating_add(count),
            None => len.max(self.start),
        };
        if self.start > len || end > len {
            return Err(RunRangeError::new(self.start, end, len));
        }
        Ok(self.start..end)
    }
}
