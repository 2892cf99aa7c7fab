//! Configuration Loader
//!
//! Layers defaults, an optional file and the process environment through the
//! `config` crate, then validates the merged result.

use super::error::{ConfigResult, ConfigurationError};
use super::DirectorConfig;
use config::{Config, Environment, File};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Environment variable naming the configuration file for [`ConfigManager::load`]
pub const CONFIG_PATH_ENV: &str = "DIRECTOR_CONFIG";
const ENV_PREFIX: &str = "DIRECTOR";
const ENV_SEPARATOR: &str = "__";

/// Loaded and validated director configuration
#[derive(Debug)]
pub struct ConfigManager {
    config: DirectorConfig,
    source: Option<PathBuf>,
}

impl ConfigManager {
    /// Load using the file named by `DIRECTOR_CONFIG`, if any
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        let path = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        Self::load_from_file(path)
    }

    /// Load from an explicit file (or defaults only) plus the process environment
    pub fn load_from_file<P: AsRef<Path>>(path: Option<P>) -> ConfigResult<Arc<ConfigManager>> {
        Self::build(path.as_ref().map(AsRef::as_ref), None)
    }

    /// Load with an explicit environment map instead of the process environment.
    /// Useful for testing without modifying global environment variables.
    pub fn load_with_environment<P: AsRef<Path>>(
        path: Option<P>,
        environment: HashMap<String, String>,
    ) -> ConfigResult<Arc<ConfigManager>> {
        Self::build(path.as_ref().map(AsRef::as_ref), Some(environment))
    }

    /// Wrap an already-built configuration
    pub fn from_config(config: DirectorConfig) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            source: None,
        }))
    }

    pub fn config(&self) -> &DirectorConfig {
        &self.config
    }

    /// File the configuration was read from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    fn build(
        path: Option<&Path>,
        environment: Option<HashMap<String, String>>,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let mut builder = Config::builder().add_source(Config::try_from(&DirectorConfig::default())?);

        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigurationError::FileNotFound {
                    path: path.display().to_string(),
                });
            }
            debug!(path = %path.display(), "Loading director configuration file");
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .try_parsing(true)
                .source(environment),
        );

        let config: DirectorConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        debug!(
            director = %config.director.name,
            rendering_threads = config.rendering.max_threads,
            compilation_threads = config.compilation.max_threads,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            source: path.map(Path::to_path_buf),
        }))
    }
}
