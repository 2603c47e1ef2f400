// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for running WebGL-style conformance suites.
//!
//! A run has two phases:
//!
//! 1. A tree of text manifests is resolved into a flat, filtered list of test pages. See
//!    [`manifest::ManifestResolver`] and [`runner::TestHarnessBuilder`].
//! 2. The pages are spread across a fixed pool of [execution slots](slot::ExecutionSlot), with a
//!    per-page [watchdog](watchdog::Watchdog) that times out pages which stop making progress.
//!    Everything that happens is reported as a [`reporter::events::HarnessEvent`].

pub mod config;
pub mod errors;
pub mod fetch;
pub mod helpers;
pub mod list;
pub mod manifest;
pub mod reporter;
pub mod runner;
pub mod slot;
mod time;
pub mod version;
pub mod watchdog;
