// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::Result;
use conformance_runner::{
    errors::RunTestsError,
    list::TestList,
    runner::{RunRange, RunSettings, TestHarness},
};
use pretty_assertions::assert_eq;
use std::time::Duration;

const PAGES: [&str; 5] = ["a.html", "b.html", "c.html", "d.html", "e.html"];

fn harness(urls: &[&str], settings: RunSettings) -> TestHarness {
    TestHarness::new(TestList::from_urls(urls.iter().copied(), &[]), settings)
}

fn with_timeout(ms: u64) -> RunSettings {
    RunSettings {
        timeout_delay: Duration::from_millis(ms),
        ..RunSettings::default()
    }
}

#[tokio::test(start_paused = true)]
async fn two_slots_start_two_pages_before_any_finish() -> Result<()> {
    let script = Script::passing([
        ("a.html", 100),
        ("b.html", 200),
        ("c.html", 100),
        ("d.html", 100),
        ("e.html", 100),
    ]);
    let mut log = EventLog::default();

    let stats = harness(&PAGES, RunSettings::default())
        .run_tests(script.slots(2), RunRange::all(), &mut log)
        .await?;

    let kinds = log.kinds();
    assert_eq!(
        kinds[..5],
        [
            Recorded::start("a.html"),
            Recorded::start("b.html"),
            Recorded::passed("a.html"),
            Recorded::completed("a.html"),
            // The slot a.html ran in is handed to the next page straight away.
            Recorded::start("c.html"),
        ]
    );
    assert_eq!(log.finished_all_count(), 1);
    assert_eq!(kinds.last(), Some(&Recorded::FinishedAll(stats)));

    assert_eq!(stats.initial_run_count, 5);
    assert_eq!(stats.finished_count, 5);
    assert_eq!(stats.completed, 5);
    assert_eq!(stats.timed_out, 0);
    assert_eq!(stats.results_passed, 5);
    assert!(stats.is_success());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn progress_keeps_page_alive() -> Result<()> {
    let mut steps = Vec::new();
    for _ in 0..5 {
        steps.push(Step::sleep_ms(600));
        steps.push(Step::Report(true));
    }
    steps.push(Step::Finish);
    let script = Script::new([("slow.html", steps)]);
    let mut log = EventLog::default();

    let stats = harness(&["slow.html"], with_timeout(1000))
        .run_tests(script.slots(1), RunRange::all(), &mut log)
        .await?;

    assert_eq!(stats.timed_out, 0);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.results_passed, 5);
    // The page ran for three times the timeout delay.
    assert!(log.elapsed_at(&Recorded::completed("slow.html")) >= Duration::from_secs(3));
    assert!(script.rejected().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn silent_page_times_out_and_frees_slot() -> Result<()> {
    let script = Script::passing([("next.html", 100)]);
    let mut log = EventLog::default();

    let stats = harness(&["hang.html", "next.html"], with_timeout(1000))
        .run_tests(script.slots(1), RunRange::all(), &mut log)
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
    let timed_out_at = log.elapsed_at(&Recorded::timed_out("hang.html"));
    assert!(
        timed_out_at >= Duration::from_secs(1) && timed_out_at < Duration::from_millis(1050),
        "timed out at {timed_out_at:?}"
    );
    assert_eq!(stats.timed_out, 1);
    assert_eq!(stats.completed, 1);
    assert!(!stats.is_success());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn reports_after_timeout_are_rejected() -> Result<()> {
    let mut long_steps = Vec::new();
    for _ in 0..3 {
        long_steps.push(Step::sleep_ms(800));
        long_steps.push(Step::Report(true));
    }
    long_steps.push(Step::Finish);
    let script = Script::new([
        (
            "late.html",
            vec![Step::sleep_ms(1500), Step::Report(true), Step::Finish],
        ),
        ("long.html", long_steps),
    ]);
    let mut log = EventLog::default();

    let stats = harness(&["late.html", "long.html"], with_timeout(1000))
        .run_tests(script.slots(2), RunRange::all(), &mut log)
        .await?;

    assert_eq!(stats.timed_out, 1);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.results_passed, 3);
    assert!(
        !log.kinds().contains(&Recorded::passed("late.html")),
        "late result must not be recorded"
    );
    assert_eq!(
        script.rejected(),
        [
            "unknown test: `late.html` is not currently running",
            "unknown test: `late.html` is not currently running",
        ]
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn timed_out_page_cannot_finish_its_reload() -> Result<()> {
    // x.html is listed twice. The first instance times out at 1s and the second starts in the
    // other slot while the first instance is still running.
    let script = Script::new([("x.html", vec![Step::sleep_ms(1500), Step::Finish])]);
    let mut log = EventLog::default();

    let stats = harness(&["x.html", "x.html"], with_timeout(1000))
        .run_tests(script.slots(2), RunRange::all(), &mut log)
        .await?;

    assert_eq!(
        log.kinds(),
        [
            Recorded::start("x.html"),
            Recorded::timed_out("x.html"),
            Recorded::start("x.html"),
            Recorded::timed_out("x.html"),
            Recorded::FinishedAll(stats),
        ]
    );
    // The second instance gets its own full timeout instead of being finished by the first.
    let second_timeout = log.events[3].0;
    assert!(
        second_timeout >= Duration::from_secs(2) && second_timeout < Duration::from_millis(2050),
        "second instance timed out at {second_timeout:?}"
    );
    assert_eq!(stats.completed, 0);
    assert_eq!(stats.timed_out, 2);
    assert_eq!(
        script.rejected(),
        ["unknown test: `x.html` is not currently running"]
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn failed_results_do_not_stop_the_run() -> Result<()> {
    let script = Script::new([
        (
            "a.html",
            vec![Step::Report(true), Step::Report(false), Step::Finish],
        ),
        ("b.html", vec![Step::Report(true), Step::Finish]),
    ]);
    let mut log = EventLog::default();

    let stats = harness(&["a.html", "b.html"], RunSettings::default())
        .run_tests(script.slots(1), RunRange::all(), &mut log)
        .await?;

    assert_eq!(stats.completed, 2);
    assert_eq!(stats.results_passed, 2);
    assert_eq!(stats.results_failed, 1);
    assert!(!stats.is_success());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn skipped_pages_are_never_loaded() -> Result<()> {
    let script = Script::passing([("a.html", 10), ("b.html", 10), ("c.html", 10)]);
    let mut log = EventLog::with_skip_list(&["b.html"]);
    let settings = RunSettings {
        allow_skip: true,
        ..RunSettings::default()
    };

    let stats = harness(&["a.html", "b.html", "c.html"], settings)
        .run_tests(script.slots(1), RunRange::all(), &mut log)
        .await?;

    let loaded: Vec<_> = script.loads().into_iter().map(|load| load.url).collect();
    assert_eq!(loaded, ["a.html", "c.html"]);
    assert!(log.kinds().contains(&Recorded::Result {
        url: "b.html".to_owned(),
        success: true,
        skipped: true,
    }));
    assert!(log.kinds().contains(&Recorded::completed("b.html")));
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.completed, 3);
    assert_eq!(stats.results_passed, 3);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn run_range_selects_pages() -> Result<()> {
    let script = Script::passing(PAGES.iter().map(|url| (*url, 10)));
    let mut log = EventLog::default();
    let range = RunRange {
        start: 1,
        count: Some(2),
    };

    let stats = harness(&PAGES, RunSettings::for_version("2.0.0"))
        .run_tests(script.slots(3), range, &mut log)
        .await?;

    let locations: Vec<_> = script
        .loads()
        .into_iter()
        .map(|load| load.location)
        .collect();
    assert_eq!(
        locations,
        ["b.html?webglVersion=2", "c.html?webglVersion=2"]
    );
    assert_eq!(stats.initial_run_count, 2);
    assert_eq!(stats.finished_count, 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn empty_range_finishes_immediately() -> Result<()> {
    let script = Script::default();
    let mut log = EventLog::default();
    let range = RunRange {
        start: 2,
        count: Some(0),
    };

    // No slots are needed when nothing runs.
    let stats = harness(&PAGES, RunSettings::default())
        .run_tests(Vec::<ScriptedSlot>::new(), range, &mut log)
        .await?;

    assert_eq!(log.kinds(), [Recorded::FinishedAll(stats)]);
    assert_eq!(stats.initial_run_count, 0);
    assert!(stats.is_success());
    assert!(script.loads().is_empty());
    Ok(())
}

#[tokio::test]
async fn invalid_runs_are_rejected() {
    let harness = harness(&PAGES, RunSettings::default());

    let range = RunRange {
        start: 4,
        count: Some(3),
    };
    let error = harness
        .run_tests(Script::default().slots(1), range, EventLog::default())
        .await
        .unwrap_err();
    assert_eq!(
        error.to_string(),
        "run range 4..7 is out of bounds for 5 tests"
    );

    let error = harness
        .run_tests(Vec::<ScriptedSlot>::new(), RunRange::all(), EventLog::default())
        .await
        .unwrap_err();
    assert_eq!(error, RunTestsError::NoSlots { count: 5 });
}
