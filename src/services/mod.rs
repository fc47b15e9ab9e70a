//! Services module - the tile replication pipeline.
//!
//! # Components
//!
//! - [`naming`]: turns a replication name into identifier suffixes
//! - [`rules`]: per-tile rewrite rules and the supported tile registry
//! - [`metadata`]: parses and rewrites the `metadata/*.yml` document
//! - [`archive`]: streams archive entries from source to destination
//! - [`TileReplicator`]: drives a full run and reports progress
//!
//! Control flows top-down: `TileReplicator` → `archive` → `metadata` →
//! `rules` + `naming`. Everything here is synchronous and holds no state
//! between runs.

pub mod archive;
pub mod error;
pub mod metadata;
pub mod naming;
pub mod replicator;
pub mod rules;

pub use error::ReplicationError;
pub use metadata::{TransformedMetadata, is_metadata_entry, transform_metadata};
pub use naming::{format_job_suffix, format_tile_suffix};
pub use replicator::{ReplicationSummary, TileReplicator};
pub use rules::{TILE_RULES, TileRule, find_rule, supported_tiles};
