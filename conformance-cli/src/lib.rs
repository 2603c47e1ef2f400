// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runs WebGL-style conformance suites from the command line.
//!
//! The `conformance` binary resolves a manifest tree into a list of test pages, then runs every
//! page through an external command, one command per execution slot.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::{OutputContext, StderrStyles};
