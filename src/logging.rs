//! Tracing initialization for the binary.
//!
//! One fmt layer for the console (compact, or JSON with `--json`) and, when a
//! log file is configured and safe to open, a second non-blocking layer
//! writing the same events without ANSI colors. A single EnvFilter derived
//! from `LogLevel` gates both; RUST_LOG is not consulted.

use anyhow::Result;
use chrono::Local;
use std::fmt as stdfmt;
use std::io;
use std::path::Path;
use sync_relocate::output as out;
use sync_relocate::platform::open_log_file_secure_append;
use sync_relocate::{LogLevel, default_log_path, path_has_symlink_ancestor};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt as tsfmt;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::registry;
use tracing_subscriber::registry::Registry;
use tracing_subscriber::util::SubscriberInitExt;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Human-friendly timestamp formatter (DD/MM/YY HH:MM:SS)
struct LocalHumanTime;
impl FormatTime for LocalHumanTime {
    fn format_time(&self, w: &mut tsfmt::format::Writer<'_>) -> stdfmt::Result {
        write!(w, "{}", Local::now().format("%d/%m/%y %H:%M:%S"))
    }
}

// Normal keeps per-step debug! lines out; Debug shows them.
fn to_level_filter(lvl: LogLevel) -> LevelFilter {
    match lvl {
        LogLevel::Quiet => LevelFilter::ERROR,
        LogLevel::Normal => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
    }
}

fn env_filter_for(lvl: LogLevel) -> EnvFilter {
    // Dependencies stay at warn whatever our own level is.
    let level = to_level_filter(lvl).to_string().to_ascii_lowercase();
    EnvFilter::new(format!("warn,sync_relocate={level}"))
}

fn fmt_layer<W>(writer: W, json: bool, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tsfmt::layer()
        .with_timer(LocalHumanTime)
        .with_ansi(ansi)
        .with_writer(writer);
    if json {
        layer.json().with_target(true).boxed()
    } else {
        layer.compact().with_target(ansi).boxed()
    }
}

/// Open `path` for non-blocking appends, or explain on stderr why not.
/// Symlinked ancestors are refused.
fn file_writer(path: &Path) -> Option<(NonBlocking, WorkerGuard)> {
    let refusal = match path_has_symlink_ancestor(path) {
        Ok(false) => None,
        Ok(true) => Some(format!("an ancestor of {} is a symlink", path.display())),
        Err(e) => Some(format!("cannot check {} for symlinks: {e}", path.display())),
    };
    if let Some(reason) = refusal {
        out::print_warn(&format!("File logging disabled: {reason}"));
        return None;
    }

    match open_log_file_secure_append(path) {
        Ok(file) => Some(tracing_appender::non_blocking(file)),
        Err(e) => {
            out::print_warn(&format!("Failed to open log file {}: {e}", path.display()));
            if let Ok(def) = default_log_path() {
                out::print_info(&format!("The default log path is {}", def.display()));
            }
            None
        }
    }
}

/// Install the global subscriber. The returned guard (present when a file
/// layer was added) must live until exit so buffered lines are flushed.
pub fn init_tracing(
    lvl: LogLevel,
    log_file: Option<&Path>,
    json: bool,
) -> Result<Option<WorkerGuard>> {
    let mut layers: Vec<BoxedLayer> = vec![fmt_layer(io::stdout, json, !json)];
    let mut guard = None;
    if let Some((writer, g)) = log_file.and_then(file_writer) {
        layers.push(fmt_layer(writer, json, false));
        guard = Some(g);
    }

    registry()
        .with(layers)
        .with(env_filter_for(lvl))
        .try_init()?;
    Ok(guard)
}
