//! Console configuration: a YAML file plus command-line overrides.
//!
//! ```yaml
//! gateway:
//!   base_url: http://localhost:8000
//!   request_timeout_secs: 10
//! session:
//!   default_sample_rate: 24000
//! sync:
//!   poll_interval_ms: 15000
//!   retry: fixed
//! log:
//!   level: info
//!   json: false
//! ```

use std::path::{Path, PathBuf};

use callops_orchestrator::{ConfigError, OrchestratorConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, Error)]
pub enum ConsoleConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Invalid(#[from] ConfigError),

    #[error("Invalid log.level '{0}'")]
    LogLevel(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ConsoleConfig {
    #[serde(flatten)]
    pub orchestrator: OrchestratorConfig,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LogConfig {
    /// Default level when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl LogConfig {
    pub fn level_filter(&self) -> Result<LevelFilter, ConsoleConfigError> {
        self.level
            .parse()
            .map_err(|_| ConsoleConfigError::LogLevel(self.level.clone()))
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Values given on the command line; each one wins over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub backend_url: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub log_level: Option<String>,
    pub log_json: bool,
}

impl ConsoleConfig {
    /// Load `path`, or the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConsoleConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path).map_err(|source| ConsoleConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|source| ConsoleConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(url) = overrides.backend_url {
            self.orchestrator.gateway.base_url = url;
        }
        if let Some(interval) = overrides.poll_interval_ms {
            self.orchestrator.sync.poll_interval_ms = interval;
        }
        if let Some(level) = overrides.log_level {
            self.log.level = level;
        }
        if overrides.log_json {
            self.log.json = true;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConsoleConfigError> {
        self.orchestrator.validate()?;
        self.log.level_filter()?;
        Ok(())
    }
}
