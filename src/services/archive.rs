//! Entry-by-entry archive copying.
//!
//! Every entry is rewritten with Deflate compression and its original unix
//! permission bits. Entry content is streamed through a fixed buffer; only the
//! metadata entry is held in memory.
//!
//! Symlinks are re-created as symlinks, which the zip writer always stores
//! uncompressed. Only the `0o777` permission bits are carried over; the zip
//! writer drops setuid, setgid and sticky bits.

use camino::Utf8Path;
use std::io::{ErrorKind, Read, Seek, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::error::ReplicationError;
use super::metadata::is_metadata_entry;
use crate::progress::{ProgressEvent, ProgressSink};

/// Buffer size for streaming entry content (64 KiB)
pub const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Entries at or above this size need zip64 headers
const LARGE_FILE_THRESHOLD: u64 = u32::MAX as u64;

/// Upper bound on the up-front allocation for a buffered entry
const MAX_PREALLOCATION: usize = 16 * 1024 * 1024;

/// File type mask of a unix mode, and the symlink type
const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

/// Replacement content for one entry of the source archive
#[derive(Debug, Clone)]
pub struct EntryReplacement {
    pub index: usize,
    pub contents: Vec<u8>,
}

/// Counters collected while copying
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    /// Entries written, directories included
    pub entries: usize,

    /// Bytes streamed from non-replaced entries
    pub bytes_copied: u64,
}

/// Find the index of the single tile metadata entry.
///
/// # Errors
///
/// [`ReplicationError::MetadataNotFound`] if no entry matches and
/// [`ReplicationError::AmbiguousMetadata`] if more than one does.
pub fn locate_metadata<R: Read + Seek>(
    archive: &ZipArchive<R>,
    archive_path: &Utf8Path,
) -> Result<usize, ReplicationError> {
    let matches: Vec<(usize, &str)> = (0..archive.len())
        .filter_map(|index| archive.name_for_index(index).map(|name| (index, name)))
        .filter(|(_, name)| is_metadata_entry(name))
        .collect();

    match matches.as_slice() {
        [] => Err(ReplicationError::MetadataNotFound(archive_path.to_path_buf())),
        [(index, name)] => {
            tracing::debug!("Tile metadata found at {} (entry {})", name, index);
            Ok(*index)
        }
        many => Err(ReplicationError::AmbiguousMetadata(
            many.iter().map(|(_, name)| name.to_string()).collect(),
        )),
    }
}

/// Read a whole entry into memory.
///
/// Returns the entry name together with its decompressed content.
pub fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    index: usize,
) -> Result<(String, Vec<u8>), ReplicationError> {
    let fallback_name = entry_name(archive, index);
    let mut entry = archive
        .by_index(index)
        .map_err(|e| ReplicationError::entry_read(&fallback_name, e))?;
    let name = entry.name().to_string();

    let capacity = usize::try_from(entry.size())
        .unwrap_or(MAX_PREALLOCATION)
        .min(MAX_PREALLOCATION);
    let mut contents = Vec::with_capacity(capacity);
    entry
        .read_to_end(&mut contents)
        .map_err(|e| ReplicationError::entry_read(&name, e))?;

    Ok((name, contents))
}

/// Copy every entry of `source` into `destination`, in order.
///
/// The entry at `replacement.index` is written with `replacement.contents`
/// instead of its original bytes. An [`ProgressEvent::EntryAdded`] is reported
/// for every entry before it is written. The first failure aborts the copy.
pub fn copy_entries<R, W>(
    source: &mut ZipArchive<R>,
    destination: &mut ZipWriter<W>,
    replacement: &EntryReplacement,
    sink: &dyn ProgressSink,
) -> Result<CopyStats, ReplicationError>
where
    R: Read + Seek,
    W: Write + Seek,
{
    let mut stats = CopyStats::default();

    for index in 0..source.len() {
        let fallback_name = entry_name(source, index);
        let mut entry = source
            .by_index(index)
            .map_err(|e| ReplicationError::entry_read(&fallback_name, e))?;
        let name = entry.name().to_string();

        sink.report(&ProgressEvent::EntryAdded { name: name.clone() });

        let options = entry_options(entry.unix_mode(), entry.size());

        if entry.is_dir() {
            destination
                .add_directory(name.as_str(), options)
                .map_err(|e| ReplicationError::entry_write(&name, e))?;
            stats.entries += 1;
            continue;
        }

        if entry.unix_mode().is_some_and(is_symlink) {
            let target = read_link_target(&name, &mut entry)?;
            destination
                .add_symlink(name.as_str(), target.as_str(), options)
                .map_err(|e| ReplicationError::entry_write(&name, e))?;
            tracing::debug!("Linked {} -> {}", name, target);
            stats.bytes_copied += target.len() as u64;
            stats.entries += 1;
            continue;
        }

        destination
            .start_file(name.as_str(), options)
            .map_err(|e| ReplicationError::entry_write(&name, e))?;

        if index == replacement.index {
            destination
                .write_all(&replacement.contents)
                .map_err(|e| ReplicationError::entry_write(&name, e))?;
            tracing::debug!("Wrote rewritten {} ({} bytes)", name, replacement.contents.len());
        } else {
            let copied = copy_stream(&name, &mut entry, destination)?;
            tracing::debug!("Copied {} ({} bytes)", name, copied);
            stats.bytes_copied += copied;
        }

        stats.entries += 1;
    }

    Ok(stats)
}

/// Write options for a copied entry: always Deflate, same permission bits.
fn entry_options(unix_mode: Option<u32>, size: u64) -> SimpleFileOptions {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(size >= LARGE_FILE_THRESHOLD);

    match unix_mode {
        Some(mode) => options.unix_permissions(mode),
        None => options,
    }
}

fn is_symlink(unix_mode: u32) -> bool {
    unix_mode & S_IFMT == S_IFLNK
}

fn read_link_target<R: Read>(entry: &str, reader: &mut R) -> Result<String, ReplicationError> {
    let mut target = String::new();
    reader
        .read_to_string(&mut target)
        .map_err(|e| ReplicationError::entry_read(entry, e))?;
    Ok(target)
}

/// Stream `reader` into `writer`, keeping read and write failures apart.
fn copy_stream<R: Read, W: Write>(
    entry: &str,
    reader: &mut R,
    writer: &mut W,
) -> Result<u64, ReplicationError> {
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(ReplicationError::entry_read(entry, e)),
        };

        writer
            .write_all(&buffer[..read])
            .map_err(|e| ReplicationError::entry_write(entry, e))?;
        total += read as u64;
    }

    Ok(total)
}

fn entry_name<R: Read + Seek>(archive: &ZipArchive<R>, index: usize) -> String {
    archive
        .name_for_index(index)
        .map(str::to_string)
        .unwrap_or_else(|| format!("#{}", index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::RecordingSink;
    use std::io::{self, Cursor};

    fn build_archive(entries: &[(&str, &str)]) -> ZipArchive<Cursor<Vec<u8>>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, contents) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
        let cursor = writer.finish().unwrap();
        ZipArchive::new(Cursor::new(cursor.into_inner())).unwrap()
    }

    #[test]
    fn test_locate_metadata() {
        let archive = build_archive(&[
            ("releases/cell.tgz", "tgz"),
            ("metadata/tile.yml", "name: x"),
        ]);
        assert_eq!(locate_metadata(&archive, Utf8Path::new("t.zip")).unwrap(), 1);
    }

    #[test]
    fn test_locate_metadata_missing() {
        let archive = build_archive(&[("releases/cell.tgz", "tgz")]);
        let err = locate_metadata(&archive, Utf8Path::new("t.zip")).unwrap_err();
        assert!(matches!(err, ReplicationError::MetadataNotFound(_)));
    }

    #[test]
    fn test_locate_metadata_ambiguous() {
        let archive = build_archive(&[
            ("metadata/a.yml", "name: a"),
            ("metadata/b.yml", "name: b"),
        ]);
        let err = locate_metadata(&archive, Utf8Path::new("t.zip")).unwrap_err();
        match err {
            ReplicationError::AmbiguousMetadata(names) => {
                assert_eq!(names, vec!["metadata/a.yml", "metadata/b.yml"])
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_entry() {
        let mut archive = build_archive(&[("metadata/tile.yml", "name: x\n")]);
        let (name, contents) = read_entry(&mut archive, 0).unwrap();
        assert_eq!(name, "metadata/tile.yml");
        assert_eq!(contents, b"name: x\n");
    }

    #[test]
    fn test_copy_entries_substitutes_replacement() {
        let mut source = build_archive(&[
            ("a.txt", "alpha"),
            ("metadata/tile.yml", "old"),
            ("b.bin", "\u{0}\u{1}\u{2}\u{3}"),
        ]);
        let mut destination = ZipWriter::new(Cursor::new(Vec::new()));
        let replacement = EntryReplacement {
            index: 1,
            contents: b"new".to_vec(),
        };
        let sink = RecordingSink::new();

        let stats = copy_entries(&mut source, &mut destination, &replacement, &sink).unwrap();
        assert_eq!(stats.entries, 3);
        assert_eq!(stats.bytes_copied, 9);
        assert_eq!(
            sink.lines(),
            vec!["adding: a.txt", "adding: metadata/tile.yml", "adding: b.bin"]
        );

        let bytes = destination.finish().unwrap().into_inner();
        let mut copy = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(read_entry(&mut copy, 0).unwrap().1, b"alpha");
        assert_eq!(read_entry(&mut copy, 1).unwrap().1, b"new");
        assert_eq!(read_entry(&mut copy, 2).unwrap().1, vec![0u8, 1, 2, 3]);
        assert_eq!(
            copy.by_index(2).unwrap().compression(),
            CompressionMethod::Deflated
        );
    }

    #[test]
    fn test_entry_options_keeps_permissions() {
        let mut destination = ZipWriter::new(Cursor::new(Vec::new()));
        destination
            .start_file("run.sh", entry_options(Some(0o100755), 10))
            .unwrap();
        destination.write_all(b"#!/bin/sh\n").unwrap();

        let bytes = destination.finish().unwrap().into_inner();
        let mut copy = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mode = copy.by_index(0).unwrap().unix_mode().unwrap();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_copy_entries_recreates_symlinks() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("bin/tool", SimpleFileOptions::default().unix_permissions(0o755))
            .unwrap();
        writer.write_all(b"#!/bin/sh\n").unwrap();
        writer
            .add_symlink("bin/tool-latest", "tool", SimpleFileOptions::default())
            .unwrap();
        let bytes = writer.finish().unwrap().into_inner();
        let mut source = ZipArchive::new(Cursor::new(bytes)).unwrap();

        let mut destination = ZipWriter::new(Cursor::new(Vec::new()));
        let replacement = EntryReplacement {
            index: usize::MAX,
            contents: Vec::new(),
        };
        copy_entries(&mut source, &mut destination, &replacement, &RecordingSink::new()).unwrap();

        let bytes = destination.finish().unwrap().into_inner();
        let mut copy = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let link_mode = copy.by_index(1).unwrap().unix_mode().unwrap();
        assert!(is_symlink(link_mode));
        assert_eq!(read_entry(&mut copy, 1).unwrap().1, b"tool");

        let file_mode = copy.by_index(0).unwrap().unix_mode().unwrap();
        assert!(!is_symlink(file_mode));
        assert_eq!(file_mode & 0o777, 0o755);
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("disk gone"))
        }
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_copy_stream_distinguishes_failures() {
        let err = copy_stream("x", &mut FailingReader, &mut Vec::<u8>::new()).unwrap_err();
        assert!(matches!(err, ReplicationError::EntryRead { .. }));

        let err = copy_stream("x", &mut &b"data"[..], &mut FailingWriter).unwrap_err();
        assert!(matches!(err, ReplicationError::EntryWrite { .. }));
    }

    #[test]
    fn test_copy_stream_larger_than_buffer() {
        let data = vec![7u8; COPY_BUFFER_SIZE * 2 + 5];
        let mut out = Vec::new();
        let copied = copy_stream("big", &mut data.as_slice(), &mut out).unwrap();
        assert_eq!(copied, data.len() as u64);
        assert_eq!(out, data);
    }
}
