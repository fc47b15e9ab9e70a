// Progress reporting
//
// The replicator reports what it is doing through a ProgressSink instead of
// writing to stdout directly, so the binary, the logs and tests can each
// decide where the lines go.

use camino::Utf8PathBuf;
use std::fmt;
use std::sync::Mutex;

/// Events emitted while a tile is replicated
///
/// The `Display` impl renders the human-readable progress line. Consumers
/// should not parse these lines.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Replication has started
    Started {
        source: Utf8PathBuf,
        destination: Utf8PathBuf,
    },

    /// An entry is being written to the destination archive
    EntryAdded { name: String },

    /// The runtime configuration of a database tile is being removed
    RuntimeConfigStripped { tile: String },

    /// The destination archive is complete
    Finished,
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started {
                source,
                destination,
            } => write!(f, "replicating {} to {}", source, destination),
            Self::EntryAdded { name } => write!(f, "adding: {}", name),
            Self::RuntimeConfigStripped { tile } => write!(
                f,
                "This replicator will remove the runtime configuration from the {} tile. \
                 This means this duplicate tile requires the original tile to operate.",
                tile
            ),
            Self::Finished => write!(f, "done"),
        }
    }
}

/// Destination for progress events
pub trait ProgressSink {
    fn report(&self, event: &ProgressEvent);
}

/// Forwards progress lines to `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn report(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::RuntimeConfigStripped { .. } => tracing::warn!("{}", event),
            _ => tracing::info!("{}", event),
        }
    }
}

/// Prints progress lines to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl ProgressSink for ConsoleSink {
    fn report(&self, event: &ProgressEvent) {
        println!("{}", event);
    }
}

/// Keeps every event in memory, in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Events rendered as progress lines
    pub fn lines(&self) -> Vec<String> {
        self.events().iter().map(ToString::to_string).collect()
    }
}

impl ProgressSink for RecordingSink {
    fn report(&self, event: &ProgressEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
    }
}

impl<S: ProgressSink + ?Sized> ProgressSink for &S {
    fn report(&self, event: &ProgressEvent) {
        (**self).report(event);
    }
}
