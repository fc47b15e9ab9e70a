use crate::models::ApplicationConfig;
use anyhow::{Context, Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat};
use std::collections::HashMap;
use std::fs;

/// Prefix for environment variables, e.g. `TILE_REPLICATOR_NAME`
pub const ENV_PREFIX: &str = "TILE_REPLICATOR";

/// Settings given explicitly on the command line.
///
/// These take precedence over the environment and the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub path: Option<Utf8PathBuf>,
    pub output: Option<Utf8PathBuf>,
    pub name: Option<String>,
}

/// Configuration manager for assembling an [`ApplicationConfig`].
///
/// Sources, lowest priority first:
/// - optional YAML config file
/// - `TILE_REPLICATOR_*` environment variables
/// - [`ConfigOverrides`] from the command line
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_file: Option<Utf8PathBuf>,
    env_vars: Option<HashMap<String, String>>,
}

impl ConfigManager {
    /// Create a new ConfigManager.
    ///
    /// # Arguments
    /// * `config_file` - Optional YAML file with `path`, `output` and `name` keys
    pub fn new<P: AsRef<Utf8Path>>(config_file: Option<P>) -> Self {
        Self {
            config_file: config_file.map(|p| p.as_ref().to_path_buf()),
            env_vars: None,
        }
    }

    /// Read environment variables from `vars` instead of the process environment.
    pub fn with_env_vars(mut self, vars: HashMap<String, String>) -> Self {
        self.env_vars = Some(vars);
        self
    }

    /// Load and validate the application configuration.
    ///
    /// # Errors
    /// Fails if the config file is missing or malformed, a required setting is
    /// absent from every source, or the result does not validate.
    pub fn load(&self, overrides: &ConfigOverrides) -> Result<ApplicationConfig> {
        let mut builder = Config::builder();

        if let Some(file) = &self.config_file {
            if !file.exists() {
                bail!("Config file not found: {}", file);
            }
            builder = builder.add_source(File::new(file.as_str(), FileFormat::Yaml));
            tracing::debug!("Using config file {}", file);
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX).source(self.env_vars.clone()),
        );

        builder = builder
            .set_override_option("path", overrides.path.as_ref().map(|p| p.to_string()))?
            .set_override_option("output", overrides.output.as_ref().map(|p| p.to_string()))?
            .set_override_option("name", overrides.name.clone())?;

        let settings = builder
            .build()
            .context("Failed to assemble replicator configuration")?;

        let config: ApplicationConfig = settings
            .try_deserialize()
            .context("Incomplete replicator configuration: path, output and name are required")?;

        config.validate().context("Invalid replicator configuration")?;

        tracing::info!(
            "Loaded configuration: path={}, output={}, name={}",
            config.path,
            config.output,
            config.name
        );
        Ok(config)
    }

    /// Save a configuration as YAML, e.g. to reuse it with `--config`.
    pub fn save(&self, config: &ApplicationConfig, path: &Utf8Path) -> Result<()> {
        let yaml_string = serde_yaml_ng::to_string(config)
            .context("Failed to serialize replicator config to YAML")?;

        fs::write(path, yaml_string)
            .with_context(|| format!("Failed to write replicator config: {}", path))?;

        tracing::info!("Saved replicator config to {}", path);
        Ok(())
    }
}
