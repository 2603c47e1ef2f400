// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runs pages through real processes with [`CommandSlot`]. These tests use the real clock.

use crate::fixtures::*;
use camino_tempfile::Utf8TempDir;
use color_eyre::eyre::Result;
use conformance_runner::{
    list::TestList,
    runner::{RunRange, RunSettings, TestHarness},
    slot::{CommandSlot, CommandTemplate},
};
use pretty_assertions::assert_eq;
use std::time::Duration;

fn harness(urls: &[&str], timeout: Duration) -> TestHarness {
    let settings = RunSettings {
        timeout_delay: timeout,
        ..RunSettings::default()
    };
    TestHarness::new(TestList::from_urls(urls.iter().copied(), &[]), settings)
}

/// Slots running `sh -c script`. The page location is passed as `$0`.
fn sh_slots(script: &str, count: usize, cwd: Option<&Utf8TempDir>) -> Vec<CommandSlot> {
    let template = CommandTemplate::new("sh", ["-c".to_owned(), script.to_owned()]);
    (0..count)
        .map(|id| {
            let mut slot = CommandSlot::new(id, template.clone());
            if let Some(dir) = cwd {
                slot.set_cwd(dir.path().to_owned());
            }
            slot
        })
        .collect()
}

fn failed(url: &str) -> Recorded {
    Recorded::Result {
        url: url.to_owned(),
        success: false,
        skipped: false,
    }
}

#[tokio::test]
async fn output_lines_become_results() -> Result<()> {
    let mut log = EventLog::default();

    let stats = harness(&["a.html"], Duration::from_secs(10))
        .run_tests(
            sh_slots("echo 'PASS: one'; echo 'not a result'; echo 'FAIL two'", 1, None),
            RunRange::all(),
            &mut log,
        )
        .await?;

    assert_eq!(
        log.kinds(),
        [
            Recorded::start("a.html"),
            Recorded::passed("a.html"),
            failed("a.html"),
            Recorded::completed("a.html"),
            Recorded::FinishedAll(stats),
        ]
    );
    assert_eq!(stats.results_passed, 1);
    assert_eq!(stats.results_failed, 1);
    assert_eq!(stats.completed, 1);
    Ok(())
}

#[tokio::test]
async fn spawn_failure_fails_page() -> Result<()> {
    let template = CommandTemplate::new("conformance-nonexistent-program", Vec::new());
    let slots = vec![CommandSlot::new(0, template)];
    let mut log = EventLog::default();

    let stats = harness(&["a.html", "b.html"], Duration::from_secs(10))
        .run_tests(slots, RunRange::all(), &mut log)
        .await?;

    assert_eq!(
        log.kinds(),
        [
            Recorded::start("a.html"),
            failed("a.html"),
            Recorded::completed("a.html"),
            Recorded::start("b.html"),
            failed("b.html"),
            Recorded::completed("b.html"),
            Recorded::FinishedAll(stats),
        ]
    );
    assert_eq!(stats.completed, 2);
    assert_eq!(stats.results_failed, 2);
    assert!(!stats.is_success());
    Ok(())
}

#[tokio::test]
async fn timed_out_process_is_killed_on_reload() -> Result<()> {
    let dir = Utf8TempDir::new()?;
    // hang.html stays silent past its timeout, then leaves a marker behind if it's still alive.
    let script = r#"case "$0" in
        hang.html*) sleep 1; echo 'PASS late'; touch survived ;;
        *) echo "PASS: $0" ;;
    esac"#;
    let mut log = EventLog::default();

    let stats = harness(&["hang.html", "next.html"], Duration::from_millis(300))
        .run_tests(sh_slots(script, 1, Some(&dir)), RunRange::all(), &mut log)
        .await?;

    assert_eq!(
        log.kinds(),
        [
            Recorded::start("hang.html"),
            Recorded::timed_out("hang.html"),
            Recorded::start("next.html"),
            Recorded::passed("next.html"),
            Recorded::completed("next.html"),
            Recorded::FinishedAll(stats),
        ]
    );
    let finished_at = log.elapsed_at(&Recorded::completed("next.html"));
    assert!(
        finished_at < Duration::from_secs(1),
        "run should not wait for the timed-out process, finished at {finished_at:?}"
    );

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(
        !dir.path().join("survived").exists(),
        "timed-out process was not killed"
    );
    assert_eq!(stats.timed_out, 1);
    assert_eq!(stats.results_passed, 1);
    Ok(())
}
