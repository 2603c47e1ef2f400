// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the conformance runner.
//!
//! Configuration is read from an embedded default config, followed by `.config/conformance.toml`
//! or an explicitly provided file. Settings are grouped into profiles: keys not set in a custom
//! profile fall back to `[profile.default]`.

mod imp;

pub use imp::*;
