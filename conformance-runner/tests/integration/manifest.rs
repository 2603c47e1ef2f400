// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use camino::Utf8Path;
use camino_tempfile::Utf8TempDir;
use color_eyre::eyre::Result;
use conformance_runner::{
    config::ConformanceConfig,
    errors::{ManifestParseErrorKind, ResolveError},
    fetch::{FsFetcher, StaticFetcher},
    manifest::{FilterOptions, ManifestResolver},
    runner::{RunSettings, TestHarnessBuilder},
};
use indoc::indoc;
use pretty_assertions::assert_eq;

const ROOT: &str = "00_test_list.txt";

fn write_suite(dir: &Utf8Path) -> Result<()> {
    let files = [
        (
            ROOT,
            indoc! {"
                // Top-level manifest.
                attribs/00_test_list.txt
                --min-version 2.0 conformance2/00_test_list.txt
                --slow misc/00_test_list.txt
            "},
        ),
        (
            "attribs/00_test_list.txt",
            indoc! {"
                gl-vertexattrib.html
                --max-version 1.9.9 gl-bindAttribLocation.html
                # retired
            "},
        ),
        (
            "conformance2/00_test_list.txt",
            indoc! {"
                buffers.html
                --min-version 1.0 legacy.html
            "},
        ),
        (
            "misc/00_test_list.txt",
            indoc! {"
                huge-textures.html
                ;
            "},
        ),
    ];
    for (path, contents) in files {
        let path = dir.join(path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
    }
    Ok(())
}

#[tokio::test]
async fn resolve_suite_from_disk() -> Result<()> {
    let dir = Utf8TempDir::new()?;
    write_suite(dir.path())?;
    let fetcher = FsFetcher::new(dir.path());

    let v1 = ManifestResolver::new(&fetcher, FilterOptions::new("1.0.4"))
        .resolve(ROOT)
        .await?;
    assert_eq!(
        v1,
        [
            "attribs/gl-vertexattrib.html",
            "attribs/gl-bindAttribLocation.html",
            "conformance2/legacy.html",
            "misc/huge-textures.html",
        ]
    );

    let v2 = ManifestResolver::new(&fetcher, FilterOptions::new("2.0.0"))
        .resolve(ROOT)
        .await?;
    assert_eq!(
        v2,
        [
            "attribs/gl-vertexattrib.html",
            "conformance2/buffers.html",
            "conformance2/legacy.html",
            "misc/huge-textures.html",
        ]
    );

    let fast = FilterOptions {
        fast: true,
        ..FilterOptions::new("2.0.0")
    };
    let v2_fast = ManifestResolver::new(&fetcher, fast).resolve(ROOT).await?;
    assert_eq!(
        v2_fast,
        [
            "attribs/gl-vertexattrib.html",
            "conformance2/buffers.html",
            "conformance2/legacy.html",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn build_reports_pages_then_ready() -> Result<()> {
    let dir = Utf8TempDir::new()?;
    write_suite(dir.path())?;
    let fetcher = FsFetcher::new(dir.path());
    let mut log = EventLog::default();

    let mut builder =
        TestHarnessBuilder::new(FilterOptions::new("2.0.0"), RunSettings::for_version("2.0.0"));
    builder.set_selected_folders(["conformance2/".to_owned()]);
    let harness = builder.build(ROOT, &fetcher, &mut log).await?;

    assert_eq!(harness.test_list().len(), 2);
    assert_eq!(
        log.kinds(),
        [
            Recorded::Add(0, "conformance2/buffers.html".to_owned()),
            Recorded::Add(1, "conformance2/legacy.html".to_owned()),
            Recorded::Ready(2),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn nested_fetch_failure_fails_build() {
    let fetcher: StaticFetcher = [
        (ROOT, "a/00_test_list.txt\nb/00_test_list.txt\n"),
        ("a/00_test_list.txt", "ok.html\n"),
    ]
    .into_iter()
    .collect();
    let mut log = EventLog::default();

    let error = TestHarnessBuilder::new(FilterOptions::new("1.0.0"), RunSettings::default())
        .build(ROOT, &fetcher, &mut log)
        .await
        .unwrap_err();

    match error {
        ResolveError::Fetch(error) => assert_eq!(error.url(), "b/00_test_list.txt"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(log.events.is_empty(), "no events on a failed build");
}

#[tokio::test]
async fn parse_error_names_manifest_and_line() {
    let fetcher: StaticFetcher = [
        (ROOT, "sub/00_test_list.txt\n"),
        ("sub/00_test_list.txt", "first.html\n--max-version\n"),
    ]
    .into_iter()
    .collect();

    let error = ManifestResolver::new(&fetcher, FilterOptions::new("1.0.0"))
        .resolve(ROOT)
        .await
        .unwrap_err();

    let ResolveError::Parse(error) = error else {
        panic!("expected a parse error, found {error}");
    };
    assert_eq!(error.manifest(), "sub/00_test_list.txt");
    assert_eq!(error.line(), 2);
    assert_eq!(error.token(), "--max-version");
    assert_eq!(
        error.kind(),
        &ManifestParseErrorKind::MissingOptionArgument {
            option: "max-version".to_owned()
        }
    );
}

#[tokio::test]
async fn config_profile_drives_resolution() -> Result<()> {
    let dir = Utf8TempDir::new()?;
    let suite = dir.path().join("suite");
    write_suite(&suite)?;
    std::fs::create_dir_all(dir.path().join(".config"))?;
    std::fs::write(
        dir.path().join(ConformanceConfig::CONFIG_PATH),
        indoc! {r#"
            base-dir = "suite"

            [profile.webgl2]
            version = "2.0.0"
            fast = true
            selected-folders = ["attribs/", "conformance2/"]
        "#},
    )?;

    let config = ConformanceConfig::from_sources(dir.path(), None)?;
    let profile = config.profile("webgl2")?;
    let fetcher = FsFetcher::new(config.base_dir());

    let mut builder = TestHarnessBuilder::new(profile.filter_options(), profile.run_settings());
    builder
        .set_selected_folders(profile.selected_folders().iter().cloned())
        .set_manifest_extension(profile.manifest_extension());
    let harness = builder
        .build(config.root_manifest(), &fetcher, EventLog::default())
        .await?;

    let urls: Vec<_> = harness.test_list().iter().map(|file| file.url()).collect();
    assert_eq!(
        urls,
        [
            "attribs/gl-vertexattrib.html",
            "conformance2/buffers.html",
            "conformance2/legacy.html",
        ]
    );
    assert_eq!(harness.settings().major_version, 2);
    Ok(())
}
