// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use clap::{Args, ValueEnum};
use owo_colors::{OwoColorize, Style, style};
use std::fmt::{self, Write as _};
use tracing::{
    Event, Level, Subscriber,
    field::{Field, Visit},
    level_filters::LevelFilter,
    warn,
};
use tracing_subscriber::{
    Layer,
    filter::{ParseError, Targets},
    fmt::{FmtContext, FormatEvent, FormatFields, format},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// The environment variable log filters are read from, e.g. `conformance_runner=trace`.
const LOG_ENV: &str = "CONFORMANCE_LOG";

/// Crates whose debug logs are shown with `--verbose`.
const VERBOSE_TARGETS: [&str; 2] = ["conformance_runner", "conformance_cli"];

/// Events logged to this target are printed without a level heading.
pub(crate) const NO_HEADING_TARGET: &str = "conformance_cli::no_heading";

pub(crate) mod clap_styles {
    use clap::builder::{
        Styles,
        styling::{AnsiColor, Effects, Style},
    };

    const HEADER: Style = AnsiColor::Green.on_default().effects(Effects::BOLD);
    const LITERAL: Style = AnsiColor::Cyan.on_default().effects(Effects::BOLD);
    const PLACEHOLDER: Style = AnsiColor::Cyan.on_default();
    const ERROR: Style = AnsiColor::Red.on_default().effects(Effects::BOLD);

    pub(crate) const fn style() -> Styles {
        Styles::styled()
            .header(HEADER)
            .usage(HEADER)
            .literal(LITERAL)
            .placeholder(PLACEHOLDER)
            .error(ERROR)
    }
}

#[derive(Copy, Clone, Debug, Args)]
#[must_use]
pub(crate) struct OutputOpts {
    /// Show every page and result, and debug logs
    #[arg(long, short, global = true, env = "CONFORMANCE_VERBOSE")]
    pub(crate) verbose: bool,

    /// Produce color output: auto, always, never
    #[arg(
        long,
        value_enum,
        default_value_t,
        hide_possible_values = true,
        global = true,
        value_name = "WHEN"
    )]
    pub(crate) color: Color,
}

impl OutputOpts {
    pub(crate) fn init(self) -> OutputContext {
        let OutputOpts { verbose, color } = self;

        let env_filter = std::env::var(LOG_ENV).ok();
        let (targets, parse_error) = log_targets(verbose, env_filter.as_deref());
        let colorize = color.should_colorize(supports_color::Stream::Stderr);
        let layer = tracing_subscriber::fmt::layer()
            .event_format(LogFormatter::new(colorize))
            .with_writer(std::io::stderr)
            .with_filter(targets);
        // Fails only if a subscriber is already installed, which keeps that one.
        _ = tracing_subscriber::registry().with(layer).try_init();

        if let Some(err) = parse_error {
            warn!("ignoring invalid {LOG_ENV}: {err}");
        }

        OutputContext { verbose, color }
    }
}

/// Returns the log filter to use, and the reason `env_filter` was ignored if it was invalid.
fn log_targets(verbose: bool, env_filter: Option<&str>) -> (Targets, Option<ParseError>) {
    let parse_error = match env_filter.filter(|filter| !filter.is_empty()) {
        Some(filter) => match filter.parse::<Targets>() {
            Ok(targets) => return (targets, None),
            Err(err) => Some(err),
        },
        None => None,
    };

    let mut targets = Targets::new().with_default(LevelFilter::INFO);
    if verbose {
        targets = targets.with_targets(VERBOSE_TARGETS.map(|target| (target, LevelFilter::DEBUG)));
    }
    (targets, parse_error)
}

/// Output settings for a single invocation.
#[derive(Copy, Clone, Debug)]
#[must_use]
pub struct OutputContext {
    pub(crate) verbose: bool,
    pub(crate) color: Color,
}

impl OutputContext {
    /// Returns general stderr styles for the current output context.
    pub fn stderr_styles(&self) -> StderrStyles {
        let mut styles = StderrStyles::default();
        if self.color.should_colorize(supports_color::Stream::Stderr) {
            styles.bold = style().bold();
        }
        styles
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
#[must_use]
pub(crate) enum Color {
    #[default]
    Auto,
    Always,
    Never,
}

impl Color {
    pub(crate) fn should_colorize(self, stream: supports_color::Stream) -> bool {
        match self {
            Color::Auto => supports_color::on_cached(stream).is_some(),
            Color::Always => true,
            Color::Never => false,
        }
    }
}

/// Formats log lines as `warning: message key=value ...`.
///
/// Runner logs identify pages through fields such as `url`, `slot` and `run_id`, so fields are
/// printed after the message rather than dropped.
struct LogFormatter {
    error: Style,
    warning: Style,
    info: Style,
    debug: Style,
    trace: Style,
    field: Style,
}

impl LogFormatter {
    fn new(colorize: bool) -> Self {
        if colorize {
            Self {
                error: style().red().bold(),
                warning: style().yellow().bold(),
                info: style().bold(),
                debug: style().blue().bold(),
                trace: style().dimmed(),
                field: style().dimmed(),
            }
        } else {
            Self {
                error: Style::new(),
                warning: Style::new(),
                info: Style::new(),
                debug: Style::new(),
                trace: Style::new(),
                field: Style::new(),
            }
        }
    }
}

impl<S, N> FormatEvent<S, N> for LogFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();

        if metadata.target() != NO_HEADING_TARGET {
            let (heading, style) = match *metadata.level() {
                Level::ERROR => ("error", self.error),
                Level::WARN => ("warning", self.warning),
                Level::INFO => ("info", self.info),
                Level::DEBUG => ("debug", self.debug),
                Level::TRACE => ("trace", self.trace),
            };
            write!(writer, "{}: ", heading.style(style))?;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        if let Some(error) = visitor.error {
            return Err(error);
        }

        write!(writer, "{}", visitor.message)?;
        if !visitor.fields.is_empty() {
            write!(writer, "{}", visitor.fields.style(self.field))?;
        }
        writeln!(writer)
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: String,
    error: Option<fmt::Error>,
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_debug(field, &format_args!("{value}"));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let res = if field.name() == "message" {
            write!(self.message, "{value:?}")
        } else {
            write!(self.fields, " {}={value:?}", field.name())
        };
        if let Err(error) = res {
            self.error = Some(error);
        }
    }
}

/// Styles for messages printed to stderr outside the reporter.
#[derive(Debug, Default)]
pub struct StderrStyles {
    pub(crate) bold: Style,
}
