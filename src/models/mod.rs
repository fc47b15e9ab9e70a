//! Data models for the tile replicator.
//!
//! - [`ApplicationConfig`]: source archive, destination archive and replication name
//! - [`TileMetadata`]: the parsed `metadata/*.yml` document of a tile
//!
//! Both are serde types. `ApplicationConfig` is deserialized by
//! [`ConfigManager`](crate::config::ConfigManager), `TileMetadata` by the
//! metadata transformer.

pub mod config;
pub mod metadata;

pub use config::{ApplicationConfig, ConfigError};
pub use metadata::TileMetadata;
