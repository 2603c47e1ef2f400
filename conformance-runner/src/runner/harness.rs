// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    RunRange, RunSettings,
    scheduler::{TestScheduler, WatchdogWake},
};
use crate::{
    errors::{HarnessHandleError, ResolveError, RunTestsError, UnknownTestError},
    fetch::TextFetcher,
    list::TestList,
    manifest::{DEFAULT_MANIFEST_EXTENSION, FilterOptions, ManifestResolver},
    reporter::{
        HarnessReporter,
        events::{HarnessEvent, HarnessEventKind, RunStats},
    },
    slot::ExecutionSlot,
    time::stopwatch,
};
use futures::{StreamExt, future::LocalBoxFuture, stream::FuturesUnordered};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Builds a [`TestHarness`] by resolving a manifest tree.
#[derive(Clone, Debug)]
pub struct TestHarnessBuilder {
    filter: FilterOptions,
    settings: RunSettings,
    selected_folders: Vec<String>,
    manifest_extension: String,
}

impl TestHarnessBuilder {
    /// Creates a new builder.
    pub fn new(filter: FilterOptions, settings: RunSettings) -> Self {
        Self {
            filter,
            settings,
            selected_folders: Vec::new(),
            manifest_extension: DEFAULT_MANIFEST_EXTENSION.to_owned(),
        }
    }

    /// Sets the folders to select tests from. An empty list selects every test.
    pub fn set_selected_folders(
        &mut self,
        selected_folders: impl IntoIterator<Item = String>,
    ) -> &mut Self {
        self.selected_folders = selected_folders.into_iter().collect();
        self
    }

    /// Sets the extension that marks nested manifests.
    pub fn set_manifest_extension(&mut self, extension: impl Into<String>) -> &mut Self {
        self.manifest_extension = extension.into();
        self
    }

    /// Resolves `root` through `fetcher` and builds the harness.
    ///
    /// An `AddPage` event is reported for every selected test, followed by `Ready`. If resolution
    /// fails, no events are reported.
    pub async fn build<F, R>(
        &self,
        root: &str,
        fetcher: &F,
        mut reporter: R,
    ) -> Result<TestHarness, ResolveError>
    where
        F: TextFetcher,
        R: HarnessReporter,
    {
        let stopwatch = stopwatch();
        let mut resolver = ManifestResolver::new(fetcher, self.filter.clone());
        resolver.set_extension(self.manifest_extension.as_str());
        let urls = resolver.resolve(root).await?;
        let test_list = TestList::from_urls(urls, &self.selected_folders);
        debug!(
            root,
            count = test_list.len(),
            selected_folders = ?self.selected_folders,
            "built test list"
        );

        for (index, file) in test_list.iter().enumerate() {
            reporter.report(HarnessEvent::new(
                stopwatch.snapshot(),
                HarnessEventKind::AddPage {
                    index,
                    url: file.url(),
                },
            ));
        }
        reporter.report(HarnessEvent::new(
            stopwatch.snapshot(),
            HarnessEventKind::Ready {
                page_count: test_list.len(),
            },
        ));

        Ok(TestHarness {
            test_list,
            settings: self.settings.clone(),
        })
    }
}

/// Runs the pages of a resolved test list.
#[derive(Clone, Debug)]
pub struct TestHarness {
    test_list: TestList,
    settings: RunSettings,
}

impl TestHarness {
    /// Creates a harness for an already-resolved test list.
    pub fn new(test_list: TestList, settings: RunSettings) -> Self {
        Self {
            test_list,
            settings,
        }
    }

    /// The tests this harness runs.
    pub fn test_list(&self) -> &TestList {
        &self.test_list
    }

    /// The settings pages are run with.
    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Runs the pages in `range`, spreading them across `slots`.
    ///
    /// Returns once `FinishedAllTests` has been reported. The run happens on the caller's task:
    /// slots report back through the [`HarnessHandle`] passed to them, typically from tasks of
    /// their own.
    pub async fn run_tests<S, R>(
        &self,
        slots: Vec<S>,
        range: RunRange,
        mut reporter: R,
    ) -> Result<RunStats, RunTestsError>
    where
        S: ExecutionSlot,
        R: HarnessReporter,
    {
        let range = range.resolve(self.test_list.len())?;
        if !range.is_empty() && slots.is_empty() {
            return Err(RunTestsError::NoSlots { count: range.len() });
        }

        let (handle, mut receiver) = HarnessHandle::channel();
        let mut scheduler = TestScheduler::new(
            self.test_list.as_slice(),
            range,
            slots,
            self.settings.clone(),
            handle,
        );
        let mut wakes: FuturesUnordered<LocalBoxFuture<'static, WatchdogWake>> =
            FuturesUnordered::new();

        scheduler.start(&mut reporter);
        loop {
            for request in scheduler.take_wake_requests() {
                wakes.push(Box::pin(request.sleep()));
            }
            if scheduler.is_finished() {
                break;
            }

            tokio::select! {
                Some(message) = receiver.recv() => {
                    handle_message(&mut scheduler, message, &mut reporter);
                }
                Some(wake) = wakes.next(), if !wakes.is_empty() => {
                    scheduler.on_watchdog_wake(wake, &mut reporter);
                }
                else => break,
            }
        }

        Ok(scheduler.run_stats())
    }
}

fn handle_message<S, R>(
    scheduler: &mut TestScheduler<'_, S>,
    message: SlotMessage,
    reporter: &mut R,
) where
    S: ExecutionSlot,
    R: HarnessReporter,
{
    let (res, reply) = match message {
        SlotMessage::Result {
            url,
            run_id,
            success,
            message,
            reply,
        } => (
            scheduler.report_result(&url, run_id, success, &message, reporter),
            reply,
        ),
        SlotMessage::Finished { url, run_id, reply } => (
            scheduler.notify_finished(&url, run_id, reporter),
            reply,
        ),
    };
    if let Err(error) = &res {
        warn!("{error}");
    }
    // The sender may have stopped waiting for the reply.
    _ = reply.send(res);
}

#[derive(Debug)]
pub(crate) enum SlotMessage {
    Result {
        url: String,
        run_id: Option<u64>,
        success: bool,
        message: String,
        reply: oneshot::Sender<Result<(), UnknownTestError>>,
    },
    Finished {
        url: String,
        run_id: Option<u64>,
        reply: oneshot::Sender<Result<(), UnknownTestError>>,
    },
}

/// A handle through which a page reports to the harness.
///
/// The handle passed to [`ExecutionSlot::load`] is bound to that load: once the page has finished
/// or timed out, its reports are rejected even if the same URL has been loaded again since.
///
/// Handles are cheap to clone and can be sent across threads.
#[derive(Clone, Debug)]
pub struct HarnessHandle {
    sender: mpsc::UnboundedSender<SlotMessage>,
    run_id: Option<u64>,
}

impl HarnessHandle {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<SlotMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender,
                run_id: None,
            },
            receiver,
        )
    }

    /// Returns a handle bound to one dispatch of a page.
    pub(crate) fn for_run(&self, run_id: u64) -> Self {
        Self {
            sender: self.sender.clone(),
            run_id: Some(run_id),
        }
    }

    /// Reports a result for the running page at `url`.
    ///
    /// This extends the page's timeout. It fails if the page isn't running, including if it has
    /// already timed out.
    pub async fn report_result(
        &self,
        url: impl Into<String>,
        success: bool,
        message: impl Into<String>,
    ) -> Result<(), HarnessHandleError> {
        let (reply, receiver) = oneshot::channel();
        self.send(
            SlotMessage::Result {
                url: url.into(),
                run_id: self.run_id,
                success,
                message: message.into(),
                reply,
            },
            receiver,
        )
        .await
    }

    /// Notifies the harness that the running page at `url` is done.
    pub async fn notify_finished(&self, url: impl Into<String>) -> Result<(), HarnessHandleError> {
        let (reply, receiver) = oneshot::channel();
        self.send(
            SlotMessage::Finished {
                url: url.into(),
                run_id: self.run_id,
                reply,
            },
            receiver,
        )
        .await
    }

    async fn send(
        &self,
        message: SlotMessage,
        receiver: oneshot::Receiver<Result<(), UnknownTestError>>,
    ) -> Result<(), HarnessHandleError> {
        self.sender
            .send(message)
            .map_err(|_| HarnessHandleError::HarnessClosed)?;
        receiver
            .await
            .map_err(|_| HarnessHandleError::HarnessClosed)??;
        Ok(())
    }
}
