// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the conformance runner.
//!
//! These tests drive the public API end to end: manifests are resolved from disk or memory, and
//! pages run in scripted execution slots under tokio's paused clock, so watchdog timings are
//! deterministic. The `command` tests run real processes instead.

#[cfg(unix)]
mod command;
mod fixtures;
mod manifest;
mod scheduler;
