//! Structured logging for ScriptPro
//!
//! All logs go to stderr so command output on stdout stays machine-readable.
//!
//! # Field conventions
//!
//! - `operation`: what is being done ("compile", "execute", "cache.get", "reload", "dispatch")
//! - `status`: outcome ("ok", "hit", "miss", "error", "invalid")
//! - `key`: compiled-unit cache key (`file:<path>` or `source:<hash prefix>`)
//! - `capability`: registered capability identifier
//! - `origin`: script origin label (relative path or `<string>`)
//!
//! ```rust,ignore
//! tracing::debug!(operation = "cache.get", status = "hit", key = %key, "Load code from cache");
//! ```
//!
//! Script `print` output is logged at `info` and `debug` output at `debug`,
//! both under the `scriptpro::script` target.

use std::io::{self, IsTerminal};
use std::fmt as std_fmt;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{
    fmt::{self, format::Writer},
    prelude::*,
    EnvFilter,
};

/// Formatter that tags every line with "scriptpro" instead of the module path
struct ScriptProFormatter {
    with_ansi: bool,
}

impl<S, N> FormatEvent<S, N> for ScriptProFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std_fmt::Result {
        let meta = event.metadata();

        write!(
            writer,
            "{} ",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.6f")
        )?;

        if self.with_ansi {
            let level_style = match *meta.level() {
                tracing::Level::ERROR => "\x1b[31m",
                tracing::Level::WARN => "\x1b[33m",
                tracing::Level::INFO => "\x1b[32m",
                tracing::Level::DEBUG => "\x1b[34m",
                tracing::Level::TRACE => "\x1b[35m",
            };
            write!(writer, "{}{:5}(scriptpro)\x1b[0m: ", level_style, meta.level())?;
        } else {
            write!(writer, "{:5}(scriptpro): ", meta.level())?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable with colors (default for development)
    Pretty,
    /// Same layout without colors (CI)
    Compact,
    /// One JSON object per line
    Json,
}

impl LogFormat {
    /// Read `SCRIPTPRO_LOG_FORMAT`, falling back on `CI`
    pub fn from_env() -> Self {
        let requested = std::env::var("SCRIPTPRO_LOG_FORMAT").unwrap_or_default();
        Self::parse(&requested, std::env::var("CI").is_ok())
    }

    fn parse(requested: &str, ci: bool) -> Self {
        match requested.to_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            "pretty" => Self::Pretty,
            _ if ci => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

/// Initialize the global tracing subscriber
///
/// # Environment Variables
///
/// - `RUST_LOG`: filter directives (default `info`)
/// - `SCRIPTPRO_LOG_FORMAT`: `pretty`, `compact` or `json`
/// - `CI`: if set, defaults to compact format
pub fn init() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    let result = match LogFormat::from_env() {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .event_format(ScriptProFormatter {
                        with_ansi: io::stderr().is_terminal(),
                    })
                    .with_writer(io::stderr),
            )
            .try_init(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .event_format(ScriptProFormatter { with_ansi: false })
                    .with_writer(io::stderr),
            )
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false)
                    .with_ansi(false)
                    .with_writer(io::stderr)
                    .json(),
            )
            .try_init(),
    };

    result.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}
