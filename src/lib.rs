// Tile Replicator - duplicate a tile archive under a new name
//
// This is the library crate containing the replication pipeline.
// The binary crate (main.rs) provides the command line entry point.

pub mod config;
pub mod logging;
pub mod models;
pub mod progress;
pub mod services;

// Re-export commonly used types for convenience
pub use config::{ConfigManager, ConfigOverrides};
pub use models::{ApplicationConfig, TileMetadata};
pub use progress::{ConsoleSink, ProgressEvent, ProgressSink, RecordingSink, TracingSink};
pub use services::{ReplicationError, ReplicationSummary, TileReplicator};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
