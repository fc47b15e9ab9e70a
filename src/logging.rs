use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Build the level filter: `RUST_LOG` wins, otherwise debug or the given default.
fn level_filter(debug_mode: bool, default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug_mode {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new(default_level)
        }
    })
}

/// Create the log directory and a daily rotating, non-blocking writer into it.
fn file_writer(
    log_dir: &Utf8Path,
    log_prefix: &str,
) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    if !log_dir.exists() {
        fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir))?;
    }

    let file_appender = rolling::daily(log_dir, log_prefix);
    Ok(tracing_appender::non_blocking(file_appender))
}

/// Setup logging to stderr, plus a rotating log file when `log_dir` is given.
///
/// Console output stays at `warn` unless `debug_mode` is set so it doesn't
/// interleave with progress lines on stdout.
///
/// # Returns
/// The file writer guard, if a log directory was given. Hold it until exit.
pub fn setup_logging_with_console(
    log_dir: Option<&Utf8Path>,
    log_prefix: &str,
    debug_mode: bool,
) -> Result<Option<WorkerGuard>> {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(level_filter(debug_mode, "warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let (non_blocking, guard) = file_writer(dir, log_prefix)?;
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(level_filter(debug_mode, "info"));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install log subscriber")?;

    tracing::debug!(
        "Logging initialized: dir={:?}, prefix={}, debug={}",
        log_dir,
        log_prefix,
        debug_mode
    );

    Ok(guard)
}
