// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reporting harness events.
//!
//! The harness reports everything that happens through a [`HarnessReporter`]. The main reporter is
//! [`PageDisplayer`], which prints progress in a human-readable form.

mod displayer;
pub mod events;

pub use displayer::*;
use events::{EventResponse, HarnessEvent};

/// Receives events from the harness.
pub trait HarnessReporter {
    /// Handles an event.
    ///
    /// The response is only meaningful for
    /// [`StartPage`](events::HarnessEventKind::StartPage) events. Returning
    /// [`EventResponse::SkipPage`] skips that page.
    fn report(&mut self, event: HarnessEvent<'_>) -> EventResponse;
}

impl<R: HarnessReporter + ?Sized> HarnessReporter for &mut R {
    fn report(&mut self, event: HarnessEvent<'_>) -> EventResponse {
        (**self).report(event)
    }
}
