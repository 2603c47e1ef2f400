// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    errors::{ExpectedError, Result},
    output::{OutputContext, OutputOpts, clap_styles},
};
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use conformance_runner::{
    config::{ConformanceConfig, ConformanceProfile},
    errors::WriteOutputError,
    fetch::FsFetcher,
    manifest::FilterOptions,
    reporter::{PageDisplayerBuilder, ReporterStderr},
    runner::{RunRange, RunSettings, TestHarness, TestHarnessBuilder},
    slot::{CommandSlot, CommandTemplate},
};
use std::{
    io::{BufWriter, Write},
    time::Duration,
};
use supports_color::Stream;
use tracing::{debug, warn};

/// Runs WebGL-style conformance suites.
///
/// Tests are listed in a tree of text manifests. Each selected page is run through a configured
/// command, and results are read from the lines the command prints.
#[derive(Debug, Parser)]
#[command(version, name = "conformance", styles = clap_styles::style())]
pub struct ConformanceApp {
    #[command(flatten)]
    output: OutputOpts,

    #[command(flatten)]
    config_opts: ConfigOpts,

    #[command(subcommand)]
    command: Command,
}

impl ConformanceApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app, returning the exit code on success.
    pub fn exec(self, output: OutputContext) -> Result<i32> {
        let workspace_root = match self.config_opts.root_dir {
            Some(root_dir) => root_dir,
            None => current_dir()?,
        };
        let config =
            ConformanceConfig::from_sources(&workspace_root, self.config_opts.config.as_deref())?;
        let profile_name = self
            .config_opts
            .profile
            .as_deref()
            .unwrap_or(ConformanceConfig::DEFAULT_PROFILE);
        let profile = config.profile(profile_name)?;
        debug!(
            workspace_root = %config.workspace_root(),
            profile = profile.name(),
            "loaded config"
        );

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| ExpectedError::RuntimeBuildFailed { err })?;

        match self.command {
            Command::List { select } => {
                let harness = runtime.block_on(select.build_harness(
                    &config,
                    &profile,
                    RunSettings::default(),
                    output,
                ))?;
                let mut writer = BufWriter::new(std::io::stdout());
                for file in harness.test_list() {
                    writeln!(writer, "{file}").map_err(WriteOutputError::from)?;
                }
                writer.flush().map_err(WriteOutputError::from)?;
                Ok(0)
            }
            Command::Run { select, run_opts } => {
                runtime.block_on(run_opts.exec(&config, &profile, select, output))
            }
        }
    }
}

fn current_dir() -> Result<Utf8PathBuf> {
    let dir = std::env::current_dir().map_err(|err| ExpectedError::CurrentDirFailed { err })?;
    Utf8PathBuf::try_from(dir).map_err(|err| ExpectedError::CurrentDirInvalidUtf8 {
        path: err.into_path_buf(),
    })
}

#[derive(Debug, Args)]
struct ConfigOpts {
    /// Config file [default: <root-dir>/.config/conformance.toml]
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<Utf8PathBuf>,

    /// Directory the config and the suite are relative to [default: current directory]
    #[arg(long, global = true, value_name = "DIR")]
    root_dir: Option<Utf8PathBuf>,

    /// Configuration profile to use
    #[arg(long, short = 'P', global = true, env = "CONFORMANCE_PROFILE")]
    profile: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the pages a run would select
    List {
        #[command(flatten)]
        select: SelectOpts,
    },

    /// Run pages
    Run {
        #[command(flatten)]
        select: SelectOpts,

        #[command(flatten)]
        run_opts: RunOpts,
    },
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Selection options")]
struct SelectOpts {
    /// Root manifest, relative to the base directory [default: from config]
    #[arg(value_name = "ROOT")]
    root: Option<String>,

    /// Version being tested
    #[arg(long = "webgl-version", value_name = "VERSION")]
    version: Option<String>,

    /// Only select tests whose minimum version is at least this
    #[arg(long, value_name = "VERSION")]
    min_version: Option<String>,

    /// Only select tests whose maximum version is at most this
    #[arg(long, value_name = "VERSION")]
    max_version: Option<String>,

    /// Skip tests marked as slow
    #[arg(long, name = "fast", overrides_with = "no-fast")]
    fast: bool,

    /// Select tests marked as slow, even if the profile sets `fast`
    #[arg(long, name = "no-fast", overrides_with = "fast")]
    no_fast: bool,

    /// Only select tests in this folder (can be repeated)
    #[arg(long = "folder", value_name = "FOLDER")]
    folders: Vec<String>,
}

impl SelectOpts {
    fn filter_options(&self, profile: &ConformanceProfile<'_>) -> FilterOptions {
        let mut filter = profile.filter_options();
        if let Some(version) = &self.version {
            filter.version = version.clone();
        }
        if let Some(min_version) = &self.min_version {
            filter.min_version = Some(min_version.clone());
        }
        if let Some(max_version) = &self.max_version {
            filter.max_version = Some(max_version.clone());
        }
        if self.no_fast {
            filter.fast = false;
        } else if self.fast {
            filter.fast = true;
        }
        filter
    }

    async fn build_harness(
        &self,
        config: &ConformanceConfig,
        profile: &ConformanceProfile<'_>,
        settings: RunSettings,
        output: OutputContext,
    ) -> Result<TestHarness> {
        let root = self.root.as_deref().unwrap_or(config.root_manifest());
        let base_dir = config.base_dir();
        let fetcher = FsFetcher::new(&base_dir);

        let mut builder = TestHarnessBuilder::new(self.filter_options(profile), settings);
        builder.set_manifest_extension(profile.manifest_extension());
        if self.folders.is_empty() {
            builder.set_selected_folders(profile.selected_folders().iter().cloned());
        } else {
            builder.set_selected_folders(self.folders.iter().cloned());
        }

        let mut displayer = PageDisplayerBuilder::default()
            .set_colorize(output.color.should_colorize(Stream::Stderr))
            .set_verbose(output.verbose)
            .build(ReporterStderr::Terminal);
        let harness = builder
            .build(root, &fetcher, &mut displayer)
            .await
            .map_err(|err| ExpectedError::LoadTestsFailed {
                root: root.to_owned(),
                base_dir: base_dir.clone(),
                err,
            })?;
        displayer.finish()?;

        debug!(
            root,
            base_dir = %fetcher.base_dir(),
            count = harness.test_list().len(),
            "loaded tests"
        );
        Ok(harness)
    }
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Runner options")]
struct RunOpts {
    /// Number of pages to run concurrently
    #[arg(long, short = 'j', value_name = "SLOTS")]
    slots: Option<usize>,

    /// How long a page may go without reporting a result before it times out
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    timeout_delay: Option<Duration>,

    /// Report skipped pages as passing
    #[arg(long, name = "allow-skip", overrides_with = "no-allow-skip")]
    allow_skip: bool,

    /// Report skipped pages as failing, even if the profile sets `allow-skip`
    #[arg(long, name = "no-allow-skip", overrides_with = "allow-skip")]
    no_allow_skip: bool,

    /// Skip pages whose URL contains this text (can be repeated)
    #[arg(long = "skip", value_name = "PATTERN")]
    skip: Vec<String>,

    /// Index of the first selected test to run
    #[arg(long, value_name = "INDEX", default_value_t = 0)]
    start: usize,

    /// Number of tests to run [default: all remaining]
    #[arg(long, value_name = "COUNT")]
    count: Option<usize>,

    /// Program to run each page with [default: from config]
    #[arg(long, value_name = "PROGRAM")]
    command: Option<String>,

    /// Arguments to the program; `{url}` is replaced by the page location
    #[arg(last = true, value_name = "ARGS")]
    command_args: Vec<String>,
}

impl RunOpts {
    fn run_settings(&self, filter: &FilterOptions, profile: &ConformanceProfile<'_>) -> RunSettings {
        let mut settings = profile.run_settings();
        settings.major_version = RunSettings::for_version(&filter.version).major_version;
        if let Some(timeout_delay) = self.timeout_delay {
            settings.timeout_delay = timeout_delay;
        }
        if self.no_allow_skip {
            settings.allow_skip = false;
        } else if self.allow_skip {
            settings.allow_skip = true;
        }
        settings
    }

    fn command_template(&self, profile: &ConformanceProfile<'_>) -> Option<CommandTemplate> {
        match &self.command {
            Some(program) => Some(CommandTemplate::new(
                program.clone(),
                self.command_args.iter().cloned(),
            )),
            None => profile.command().cloned(),
        }
    }

    async fn exec(
        self,
        config: &ConformanceConfig,
        profile: &ConformanceProfile<'_>,
        select: SelectOpts,
        output: OutputContext,
    ) -> Result<i32> {
        let template =
            self.command_template(profile)
                .ok_or_else(|| ExpectedError::NoCommand {
                    profile: profile.name().to_owned(),
                })?;
        let settings = self.run_settings(&select.filter_options(profile), profile);
        let harness = select
            .build_harness(config, profile, settings, output)
            .await?;
        if harness.test_list().is_empty() {
            return Err(ExpectedError::NoTestsRun);
        }

        let slot_count = self.slots.unwrap_or_else(|| profile.slots());
        if slot_count == 0 {
            warn!("slot count is 0, running with 1 slot");
        }
        let base_dir = config.base_dir();
        let slots: Vec<_> = (0..slot_count.max(1))
            .map(|id| {
                let mut slot = CommandSlot::new(id, template.clone());
                slot.set_cwd(base_dir.clone());
                slot
            })
            .collect();

        let mut displayer = PageDisplayerBuilder::default()
            .set_colorize(output.color.should_colorize(Stream::Stderr))
            .set_verbose(output.verbose)
            .set_skip_list(self.skip)
            .build(ReporterStderr::Terminal);
        let range = RunRange {
            start: self.start,
            count: self.count,
        };
        let run_stats = harness.run_tests(slots, range, &mut displayer).await?;
        displayer.finish()?;

        if run_stats.initial_run_count == 0 {
            Err(ExpectedError::NoTestsRun)
        } else if run_stats.is_success() {
            Ok(0)
        } else {
            Err(ExpectedError::TestRunFailed)
        }
    }
}
