use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Settings for a single replication run.
///
/// The replication core consumes this read-only and assumes every field is
/// set. [`ApplicationConfig::validate`] is applied by the configuration layer
/// before a run is started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Source tile archive
    pub path: Utf8PathBuf,

    /// Destination tile archive
    pub output: Utf8PathBuf,

    /// Replication name, e.g. "My App"
    pub name: String,
}

/// Validation failures for [`ApplicationConfig`]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting '{0}'")]
    MissingSetting(&'static str),

    #[error("output {0} must differ from the source tile")]
    OutputIsSource(Utf8PathBuf),
}

impl ApplicationConfig {
    pub fn new(
        path: impl Into<Utf8PathBuf>,
        output: impl Into<Utf8PathBuf>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            output: output.into(),
            name: name.into(),
        }
    }

    /// Check that every setting is present and the output won't clobber the source.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.path.as_str().trim().is_empty() {
            return Err(ConfigError::MissingSetting("path"));
        }
        if self.output.as_str().trim().is_empty() {
            return Err(ConfigError::MissingSetting("output"));
        }
        if self.name.trim().is_empty() {
            return Err(ConfigError::MissingSetting("name"));
        }
        if self.path == self.output {
            return Err(ConfigError::OutputIsSource(self.output.clone()));
        }
        Ok(())
    }
}
