//! Tile Replicator - command line entry point.
//!
//! Duplicates a tile archive under a new name so both can be installed side
//! by side.
//!
//! # Execution Flow
//!
//! 1. Parse arguments
//! 2. Initialize logging (stderr, plus a rotating file with `--log-dir`)
//! 3. Assemble the configuration: `--config` file, `TILE_REPLICATOR_*`
//!    environment variables, then command line flags
//! 4. Replicate, printing progress lines to stdout (suppressed by `--quiet`)
//!
//! # Example
//!
//! ```text
//! tile-replicator --path p-isolation-segment-2.5.0.pivotal \
//!     --output p-isolation-segment-blue-2.5.0.pivotal \
//!     --name Blue
//! ```

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use tile_replicator::config::{ConfigManager, ConfigOverrides};
use tile_replicator::progress::{ConsoleSink, ProgressSink, TracingSink};
use tile_replicator::{APP_NAME, TileReplicator, VERSION};

/// Replicate a tile so it can be installed next to the original
#[derive(Parser, Debug)]
#[command(name = "tile-replicator")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the source tile
    #[arg(long)]
    path: Option<Utf8PathBuf>,

    /// Path for the replicated tile
    #[arg(long)]
    output: Option<Utf8PathBuf>,

    /// Name of the replicated tile, e.g. "Blue"
    #[arg(long)]
    name: Option<String>,

    /// YAML file providing path, output and name
    #[arg(short, long, env = "TILE_REPLICATOR_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Also write logs to a daily rotating file in this directory
    #[arg(long)]
    log_dir: Option<Utf8PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Don't print progress lines to stdout
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = tile_replicator::logging::setup_logging_with_console(
        args.log_dir.as_deref(),
        APP_NAME,
        args.debug,
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let overrides = ConfigOverrides {
        path: args.path,
        output: args.output,
        name: args.name,
    };
    let config = ConfigManager::new(args.config.as_deref()).load(&overrides)?;

    let result = if args.quiet {
        run(TileReplicator::new(TracingSink), &config)
    } else {
        run(TileReplicator::new(ConsoleSink), &config)
    };

    result.with_context(|| format!("Failed to replicate {}", config.path))
}

fn run<S: ProgressSink>(
    replicator: TileReplicator<S>,
    config: &tile_replicator::ApplicationConfig,
) -> Result<()> {
    let summary = replicator.replicate(config)?;

    tracing::info!(
        "Replicated {} as {} ({} entries)",
        summary.original_name,
        summary.new_name,
        summary.entries
    );
    Ok(())
}
