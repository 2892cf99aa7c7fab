//! # Director Configuration
//!
//! Typed configuration for the orchestration core: director identity, worker
//! pool sizing, deployment locking and logging.
//!
//! Values are layered by [`ConfigManager`]: built-in defaults, then an optional
//! configuration file, then `DIRECTOR__`-prefixed environment variables
//! (`DIRECTOR__RENDERING__MAX_THREADS=8`).
//!
//! ```rust,no_run
//! use director_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load_from_file(Some("config/director.yml"))?;
//! let threads = manager.config().rendering.max_threads;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DirectorConfig {
    pub director: DirectorSettings,
    pub worker_pool: WorkerPoolConfig,
    /// Concurrency of template rendering fan-out
    pub rendering: ConcurrencyConfig,
    /// Concurrency handed to package compilation
    pub compilation: ConcurrencyConfig,
    pub locking: LockingConfig,
    pub logging: LoggingConfig,
}

impl DirectorConfig {
    /// Reject values the orchestrator cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.director.name.trim().is_empty() {
            return Err(ConfigurationError::invalid_value(
                "director.name",
                self.director.name.clone(),
                "director name must not be empty",
            ));
        }
        for (field, section) in [
            ("rendering.max_threads", &self.rendering),
            ("compilation.max_threads", &self.compilation),
        ] {
            if section.max_threads == 0 {
                return Err(ConfigurationError::invalid_value(
                    field,
                    "0",
                    "at least one worker thread is required",
                ));
            }
        }
        if self.worker_pool.poll_interval_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "worker_pool.poll_interval_ms",
                "0",
                "poll interval must be positive",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DirectorSettings {
    /// Prefix for config-server variable paths (`/<name>/<deployment>/<variable>`)
    pub name: String,
}

impl Default for DirectorSettings {
    fn default() -> Self {
        Self {
            name: "director".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerPoolConfig {
    pub poll_interval_ms: u64,
}

impl WorkerPoolConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    pub max_threads: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self { max_threads: 32 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LockingConfig {
    /// How long to wait for another task to release a deployment lock
    pub timeout_seconds: u64,
    pub poll_interval_ms: u64,
}

impl LockingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for LockingConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            poll_interval_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG` when set
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
