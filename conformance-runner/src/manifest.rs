// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Manifest parsing and resolution.
//!
//! A manifest is a text file listing test URLs, one per line. A line whose URL ends in the manifest
//! extension (`.txt` by default) names a nested manifest, resolved relative to the directory of the
//! manifest that includes it. Lines may carry options before or after the URL:
//!
//! * `--min-version <v>`: the minimum version a test requires.
//! * `--max-version <v>`: the maximum version a test supports.
//! * `--slow`: the test is slow and is skipped in fast runs.
//!
//! Options on a nested manifest's line become the defaults for everything beneath it, while options
//! on a test line only apply to that test.
//!
//! The main type here is [`ManifestResolver`].

mod entry;
mod options;
mod resolver;

pub use entry::*;
pub use options::*;
pub use resolver::*;
