// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Execution slots: the contexts that pages run in.
//!
//! The harness never looks inside a slot. It asks the slot to load a page, and the page reports
//! back through the [`HarnessHandle`] it was given.

mod command;

use crate::runner::HarnessHandle;
pub use command::*;

/// A page to load into a slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageLoad {
    /// The URL of the page in the test list. Results and the finish notification must be reported
    /// under this URL.
    pub url: String,

    /// The location to load, including query parameters.
    pub location: String,
}

/// An isolated context that runs one page at a time.
pub trait ExecutionSlot {
    /// Loads a page into this slot, replacing whatever was loaded before.
    ///
    /// This must not block. The page reports progress through `handle` and calls
    /// [`HarnessHandle::notify_finished`] when it is done.
    fn load(&mut self, page: PageLoad, handle: HarnessHandle);
}

impl<S: ExecutionSlot + ?Sized> ExecutionSlot for Box<S> {
    fn load(&mut self, page: PageLoad, handle: HarnessHandle) {
        (**self).load(page, handle)
    }
}
