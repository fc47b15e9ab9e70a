//! Shared fixtures for building and inspecting tile archives in tests.

#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use std::fs::File;
use std::io::{Read, Write};
use tempfile::TempDir;
use tile_replicator::ApplicationConfig;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const ISOLATION_SEGMENT_METADATA: &str = "\
name: p-isolation-segment
label: Isolation Segment
description: Run apps in isolated compute
job_types:
- name: isolated_diego_cell
  label: Diego Cells
- name: isolated_ha_proxy
  label: HAProxy
- name: isolated_router
  label: Router
";

pub const MONGODB_METADATA: &str = "\
name: mongodb-on-demand
label: MongoDB Enterprise Service
job_types:
- name: mongodb_broker
  manifest:
    broker_name: mongodb-odb
    service_name: mongodb-odb
runtime_configs:
- name: mongodb-dns
  runtime_config:
    releases:
    - name: bosh-dns-aliases
      version: 1.2.6
stemcell_criteria:
  os: ubuntu-xenial
";

/// One entry of a fixture archive
#[derive(Debug, Clone)]
pub struct FixtureEntry {
    pub name: String,
    pub contents: Vec<u8>,
    pub unix_mode: Option<u32>,
    pub method: CompressionMethod,
    pub directory: bool,
}

/// Builder for tile archives on disk
#[derive(Debug, Default)]
pub struct TileFixture {
    entries: Vec<FixtureEntry>,
}

impl TileFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// A typical tile: metadata, a release tarball, a migration script
    pub fn with_metadata(metadata: &str) -> Self {
        Self::new()
            .directory("metadata/")
            .file("metadata/tile.yml", metadata.as_bytes())
            .file("releases/cell-release.tgz", &binary_blob(200 * 1024))
            .file_with(
                "migrations/v1/201801010000_noop.js",
                b"exports.migrate = function(input) { return input; };\n",
                Some(0o755),
                CompressionMethod::Stored,
            )
    }

    pub fn file(self, name: &str, contents: &[u8]) -> Self {
        self.file_with(name, contents, None, CompressionMethod::Deflated)
    }

    pub fn file_with(
        mut self,
        name: &str,
        contents: &[u8],
        unix_mode: Option<u32>,
        method: CompressionMethod,
    ) -> Self {
        self.entries.push(FixtureEntry {
            name: name.to_string(),
            contents: contents.to_vec(),
            unix_mode,
            method,
            directory: false,
        });
        self
    }

    pub fn directory(mut self, name: &str) -> Self {
        self.entries.push(FixtureEntry {
            name: name.to_string(),
            contents: Vec::new(),
            unix_mode: None,
            method: CompressionMethod::Stored,
            directory: true,
        });
        self
    }

    pub fn entries(&self) -> &[FixtureEntry] {
        &self.entries
    }

    pub fn write(&self, path: &Utf8Path) {
        let mut writer = ZipWriter::new(File::create(path).unwrap());

        for entry in &self.entries {
            let mut options = SimpleFileOptions::default().compression_method(entry.method);
            if let Some(mode) = entry.unix_mode {
                options = options.unix_permissions(mode);
            }

            if entry.directory {
                writer.add_directory(entry.name.as_str(), options).unwrap();
            } else {
                writer.start_file(entry.name.as_str(), options).unwrap();
                writer.write_all(&entry.contents).unwrap();
            }
        }

        writer.finish().unwrap();
    }
}

/// An entry read back from an archive
#[derive(Debug, Clone)]
pub struct ArchivedEntry {
    pub name: String,
    pub contents: Vec<u8>,
    pub unix_mode: Option<u32>,
    pub compression: CompressionMethod,
    pub directory: bool,
}

pub fn read_archive(path: &Utf8Path) -> Vec<ArchivedEntry> {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut entries = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).unwrap();
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents).unwrap();

        entries.push(ArchivedEntry {
            name: entry.name().to_string(),
            contents,
            unix_mode: entry.unix_mode(),
            compression: entry.compression(),
            directory: entry.is_dir(),
        });
    }

    entries
}

pub fn entry_text(entries: &[ArchivedEntry], name: &str) -> String {
    let entry = entries
        .iter()
        .find(|e| e.name == name)
        .unwrap_or_else(|| panic!("entry {} not found", name));
    String::from_utf8(entry.contents.clone()).unwrap()
}

/// Flip the first byte of `marker` inside the archive at `path`.
///
/// `marker` must be the content of a stored entry, so the archive still opens
/// but that entry fails its checksum when read.
pub fn corrupt_stored_entry(path: &Utf8Path, marker: &[u8]) {
    let mut bytes = std::fs::read(path).unwrap();
    let offset = bytes
        .windows(marker.len())
        .position(|window| window == marker)
        .unwrap_or_else(|| panic!("marker not found in {}", path));
    bytes[offset] ^= 0xff;
    std::fs::write(path, bytes).unwrap();
}

/// Deterministic, poorly compressible bytes
pub fn binary_blob(len: usize) -> Vec<u8> {
    let mut state: u32 = 0x1234_5678;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state & 0xff) as u8
        })
        .collect()
}

/// Temp directory with source and output paths inside it
pub struct Workspace {
    _dir: TempDir,
    pub source: Utf8PathBuf,
    pub output: Utf8PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        Self {
            source: root.join("source.pivotal"),
            output: root.join("replica.pivotal"),
            _dir: dir,
        }
    }

    pub fn config(&self, name: &str) -> ApplicationConfig {
        ApplicationConfig::new(self.source.clone(), self.output.clone(), name)
    }
}
