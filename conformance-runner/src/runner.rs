// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The test runner.
//!
//! The main structures in this module are [`TestHarnessBuilder`] and [`TestHarness`].

mod harness;
mod scheduler;
mod settings;

pub use harness::*;
pub use settings::*;
