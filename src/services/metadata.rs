//! Tile metadata transformation.
//!
//! Locates the metadata document of a tile, renames the tile and applies the
//! rewrite rule for its tile type.

use regex::Regex;
use std::sync::LazyLock;

use super::error::ReplicationError;
use super::naming::{format_job_suffix, format_tile_suffix};
use super::rules::find_rule;
use crate::models::{ApplicationConfig, TileMetadata};
use crate::progress::{ProgressEvent, ProgressSink};

static METADATA_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"metadata/.*\.yml$").expect("Invalid metadata path regex"));

/// Output of [`transform_metadata`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformedMetadata {
    /// Tile identity before replication
    pub original_name: String,

    /// Tile identity of the duplicate
    pub new_name: String,

    /// Rewritten metadata document
    pub contents: Vec<u8>,
}

/// Whether an archive entry is the tile metadata document
pub fn is_metadata_entry(entry_name: &str) -> bool {
    METADATA_PATH.is_match(entry_name)
}

/// Rewrite a tile metadata document for replication under `config.name`.
///
/// `name` becomes `<name>-<tile suffix>` and `label` becomes
/// `<label> (<config name>)`. The document is then re-serialized and the
/// rewrite rule registered for the original `name` is applied to the text.
///
/// # Errors
///
/// - [`ReplicationError::Parse`] if the document is not a YAML mapping
/// - [`ReplicationError::MissingField`] if `name` or `label` is absent
/// - [`ReplicationError::UnsupportedTile`] if `name` is not a supported tile
pub fn transform_metadata(
    raw: &[u8],
    config: &ApplicationConfig,
    sink: &dyn ProgressSink,
) -> Result<TransformedMetadata, ReplicationError> {
    let mut metadata = TileMetadata::from_slice(raw).map_err(ReplicationError::Parse)?;

    let original_name = metadata
        .get_text("name")
        .ok_or(ReplicationError::MissingField("name"))?;
    let rule = find_rule(&original_name).ok_or_else(|| ReplicationError::UnsupportedTile {
        tile: original_name.clone(),
    })?;

    let new_name = format!("{}-{}", original_name, format_tile_suffix(&config.name));
    metadata.set_text("name", new_name.clone());

    let label = metadata
        .get_text("label")
        .ok_or(ReplicationError::MissingField("label"))?;
    metadata.set_text("label", format!("{} ({})", label, config.name));

    let serialized = metadata.to_yaml().map_err(ReplicationError::Serialize)?;

    if rule.strips_runtime_config {
        sink.report(&ProgressEvent::RuntimeConfigStripped {
            tile: original_name.clone(),
        });
    }

    let job_suffix = format_job_suffix(&config.name);
    tracing::debug!("Applying {} rewrite with job suffix {}", rule.identity, job_suffix);
    let contents = (rule.rewrite)(&serialized, &job_suffix);

    Ok(TransformedMetadata {
        original_name,
        new_name,
        contents: contents.into_bytes(),
    })
}
