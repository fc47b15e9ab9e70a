use camino::Utf8PathBuf;
use thiserror::Error;
use zip::result::ZipError;

use super::rules::supported_tiles;

/// Errors that can occur while replicating a tile
///
/// Every variant aborts the replication. A destination archive that was
/// already created when the error occurred is removed.
#[derive(Error, Debug)]
pub enum ReplicationError {
    #[error("could not open source tile {path}")]
    SourceOpen {
        path: Utf8PathBuf,
        #[source]
        source: ZipError,
    },

    #[error("could not create destination tile {path}")]
    DestinationCreate {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("destination {path} is the source tile itself")]
    DestinationIsSource { path: Utf8PathBuf },

    #[error("failed to read archive entry {entry}")]
    EntryRead {
        entry: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write archive entry {entry}")]
    EntryWrite {
        entry: String,
        #[source]
        source: std::io::Error,
    },

    #[error("tile metadata is not a valid YAML mapping")]
    Parse(#[source] serde_yaml_ng::Error),

    #[error("failed to serialize tile metadata")]
    Serialize(#[source] serde_yaml_ng::Error),

    #[error("Tile metadata file is missing required tile property '{0}'")]
    MissingField(&'static str),

    #[error("the replicator does not replicate {tile}, supported tiles are {}", supported_tiles().join(", "))]
    UnsupportedTile { tile: String },

    #[error("no tile metadata (metadata/*.yml) found in {0}")]
    MetadataNotFound(Utf8PathBuf),

    #[error("found more than one tile metadata file: {}", .0.join(", "))]
    AmbiguousMetadata(Vec<String>),

    #[error("failed to finalize destination tile {path}")]
    Finalize {
        path: Utf8PathBuf,
        #[source]
        source: ZipError,
    },
}

impl ReplicationError {
    pub(crate) fn entry_read(entry: &str, source: impl Into<std::io::Error>) -> Self {
        Self::EntryRead {
            entry: entry.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn entry_write(entry: &str, source: impl Into<std::io::Error>) -> Self {
        Self::EntryWrite {
            entry: entry.to_string(),
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_tile_lists_allow_list() {
        let err = ReplicationError::UnsupportedTile {
            tile: "unsupported-tile".to_string(),
        };
        let message = err.to_string();

        assert!(message.contains("unsupported-tile"));
        for tile in ["p-isolation-segment", "p-windows-runtime", "pas-windows", "mongodb-on-demand"] {
            assert!(message.contains(tile), "missing {} in {}", tile, message);
        }
    }

    #[test]
    fn test_missing_field_message() {
        let err = ReplicationError::MissingField("label");
        assert_eq!(
            err.to_string(),
            "Tile metadata file is missing required tile property 'label'"
        );
    }

    #[test]
    fn test_entry_errors_convert_zip_errors() {
        let err = ReplicationError::entry_write("a.txt", ZipError::FileNotFound);
        assert!(matches!(err, ReplicationError::EntryWrite { ref entry, .. } if entry == "a.txt"));
    }
}
