// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::EntryOptions;
use crate::version::is_at_least;

/// The minimum version assumed for tests that don't declare one.
pub const DEFAULT_MIN_VERSION: &str = "1.0";

/// Defaults inherited from the manifest lines that include a nested manifest.
///
/// Each nested manifest receives its own copy, created by [`Self::with_overrides`], so that
/// siblings never observe each other's defaults.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HierarchicalOptions {
    default_version: String,
    default_max_version: Option<String>,
    default_slow: bool,
}

impl Default for HierarchicalOptions {
    fn default() -> Self {
        Self {
            default_version: DEFAULT_MIN_VERSION.to_owned(),
            default_max_version: None,
            default_slow: false,
        }
    }
}

impl HierarchicalOptions {
    /// Returns a copy of these defaults with the options explicitly written on a line applied.
    pub fn with_overrides(&self, options: &EntryOptions) -> Self {
        Self {
            default_version: options
                .min_version
                .clone()
                .unwrap_or_else(|| self.default_version.clone()),
            default_max_version: options
                .max_version
                .clone()
                .or_else(|| self.default_max_version.clone()),
            default_slow: options.slow || self.default_slow,
        }
    }

    /// Returns the effective options for a test line, falling back to these defaults.
    pub fn effective<'a>(&'a self, options: &'a EntryOptions) -> EffectiveOptions<'a> {
        EffectiveOptions {
            min_version: options
                .min_version
                .as_deref()
                .unwrap_or(&self.default_version),
            max_version: options
                .max_version
                .as_deref()
                .or(self.default_max_version.as_deref()),
            slow: options.slow || self.default_slow,
        }
    }

    /// The inherited minimum version.
    pub fn default_version(&self) -> &str {
        &self.default_version
    }

    /// The inherited maximum version, if any.
    pub fn default_max_version(&self) -> Option<&str> {
        self.default_max_version.as_deref()
    }

    /// True if tests beneath this point are slow by default.
    pub fn default_slow(&self) -> bool {
        self.default_slow
    }
}

/// The options that apply to a single test after inheritance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EffectiveOptions<'a> {
    /// The minimum version the test requires.
    pub min_version: &'a str,

    /// The maximum version the test supports, if any.
    pub max_version: Option<&'a str>,

    /// True if the test is slow.
    pub slow: bool,
}

/// Global options that select which tests are part of a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterOptions {
    /// The version being tested.
    pub version: String,

    /// If set, only select tests whose declared minimum version is at least this.
    pub min_version: Option<String>,

    /// If set, only select tests declaring a maximum version that this is at least.
    pub max_version: Option<String>,

    /// If true, skip slow tests.
    pub fast: bool,
}

impl FilterOptions {
    /// Creates a new set of filter options for the given version.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Self::default()
        }
    }

    /// Returns true if a test with these effective options is selected.
    ///
    /// The first matching rule wins:
    ///
    /// 1. In fast mode, slow tests are excluded.
    /// 2. If `min_version` is set, a test is selected if its declared minimum is at least
    ///    `min_version`. This picks out tests gated at or above a version.
    /// 3. If `max_version` is set and the test declares a maximum, the test is selected if
    ///    `max_version` is at least the declared maximum.
    /// 4. Otherwise, a test is selected if `version` is at least its declared minimum and, if it
    ///    declares a maximum, that maximum is at least `version`.
    pub fn includes(&self, effective: &EffectiveOptions<'_>) -> bool {
        if self.fast && effective.slow {
            return false;
        }
        if let Some(min_version) = non_empty(self.min_version.as_deref()) {
            return is_at_least(effective.min_version, min_version);
        }
        if let (Some(max_version), Some(test_max)) = (
            non_empty(self.max_version.as_deref()),
            non_empty(effective.max_version),
        ) {
            return is_at_least(max_version, test_max);
        }

        is_at_least(&self.version, effective.min_version)
            && non_empty(effective.max_version)
                .is_none_or(|test_max| is_at_least(test_max, &self.version))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
