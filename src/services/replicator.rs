use camino::{Utf8Path, Utf8PathBuf};
use std::fs::{self, File};
use std::io::{Read, Seek};
use zip::result::ZipError;
use zip::{ZipArchive, ZipWriter};

use super::archive::{CopyStats, EntryReplacement, copy_entries, locate_metadata, read_entry};
use super::error::ReplicationError;
use super::metadata::transform_metadata;
use crate::models::ApplicationConfig;
use crate::progress::{ProgressEvent, ProgressSink};

/// Outcome of a successful replication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationSummary {
    pub source: Utf8PathBuf,
    pub destination: Utf8PathBuf,

    /// Path of the metadata entry inside the archive
    pub metadata_entry: String,

    /// Tile identity before and after replication
    pub original_name: String,
    pub new_name: String,

    /// Entries written to the destination, directories included
    pub entries: usize,

    /// Bytes streamed from entries other than the metadata document
    pub bytes_copied: u64,
}

/// Duplicates tile archives under a new name.
///
/// The replicator holds no state between runs; the sink only receives
/// progress events.
///
/// # Example
///
/// ```no_run
/// use tile_replicator::{ApplicationConfig, TileReplicator, TracingSink};
///
/// let replicator = TileReplicator::new(TracingSink);
/// let config = ApplicationConfig::new("p-isolation-segment.pivotal", "blue.pivotal", "Blue");
/// let summary = replicator.replicate(&config)?;
/// println!("{} -> {}", summary.original_name, summary.new_name);
/// # Ok::<(), tile_replicator::ReplicationError>(())
/// ```
pub struct TileReplicator<S: ProgressSink> {
    sink: S,
}

impl<S: ProgressSink> TileReplicator<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    /// Replicate `config.path` into `config.output` under `config.name`.
    ///
    /// The metadata document is read and rewritten before the destination is
    /// created, so metadata errors never leave an output file behind. Any
    /// later failure removes the incomplete destination. An output path that
    /// resolves to the source file is rejected before anything is opened.
    pub fn replicate(
        &self,
        config: &ApplicationConfig,
    ) -> Result<ReplicationSummary, ReplicationError> {
        self.sink.report(&ProgressEvent::Started {
            source: config.path.clone(),
            destination: config.output.clone(),
        });
        tracing::info!(
            "Replicating {} to {} as '{}'",
            config.path,
            config.output,
            config.name
        );

        if is_same_file(&config.path, &config.output) {
            return Err(ReplicationError::DestinationIsSource {
                path: config.output.clone(),
            });
        }

        let mut source = open_source(&config.path)?;

        let metadata_index = locate_metadata(&source, &config.path)?;
        let (metadata_entry, raw_metadata) = read_entry(&mut source, metadata_index)?;
        let transformed = transform_metadata(&raw_metadata, config, &self.sink)?;
        tracing::info!(
            "Renaming tile {} to {}",
            transformed.original_name,
            transformed.new_name
        );

        let replacement = EntryReplacement {
            index: metadata_index,
            contents: transformed.contents,
        };

        let destination = File::create(&config.output).map_err(|e| {
            ReplicationError::DestinationCreate {
                path: config.output.clone(),
                source: e,
            }
        })?;

        let written = write_destination(
            &mut source,
            destination,
            &replacement,
            &self.sink,
            &config.output,
        );
        let stats = match written {
            Ok(stats) => stats,
            Err(e) => {
                discard_incomplete(&config.output);
                return Err(e);
            }
        };

        self.sink.report(&ProgressEvent::Finished);
        tracing::info!(
            "Replicated {} entries ({} bytes copied) to {}",
            stats.entries,
            stats.bytes_copied,
            config.output
        );

        Ok(ReplicationSummary {
            source: config.path.clone(),
            destination: config.output.clone(),
            metadata_entry,
            original_name: transformed.original_name,
            new_name: transformed.new_name,
            entries: stats.entries,
            bytes_copied: stats.bytes_copied,
        })
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

fn open_source(path: &Utf8Path) -> Result<ZipArchive<File>, ReplicationError> {
    let file = File::open(path).map_err(|e| ReplicationError::SourceOpen {
        path: path.to_path_buf(),
        source: ZipError::Io(e),
    })?;

    ZipArchive::new(file).map_err(|e| ReplicationError::SourceOpen {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Whether `output` already exists and resolves to the same file as `source`,
/// however the two paths are spelled.
fn is_same_file(source: &Utf8Path, output: &Utf8Path) -> bool {
    match (source.canonicalize(), output.canonicalize()) {
        (Ok(source), Ok(output)) => source == output,
        _ => false,
    }
}

fn write_destination<R: Read + Seek>(
    source: &mut ZipArchive<R>,
    destination: File,
    replacement: &EntryReplacement,
    sink: &dyn ProgressSink,
    output: &Utf8Path,
) -> Result<CopyStats, ReplicationError> {
    let mut writer = ZipWriter::new(destination);
    let stats = copy_entries(source, &mut writer, replacement, sink)?;

    writer.finish().map_err(|e| ReplicationError::Finalize {
        path: output.to_path_buf(),
        source: e,
    })?;

    Ok(stats)
}

/// Remove a destination archive left behind by a failed run.
fn discard_incomplete(output: &Utf8Path) {
    match fs::remove_file(output) {
        Ok(()) => tracing::info!("Removed incomplete destination tile {}", output),
        Err(e) => tracing::warn!(
            "Failed to remove incomplete destination tile {}: {}",
            output,
            e
        ),
    }
}
