//! Orchestrator configuration.
//!
//! Every field has a default so an empty YAML document is a valid configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::sync::RetryPolicy;

const MIN_SAMPLE_RATE: u32 = 8_000;
const MAX_SAMPLE_RATE: u32 = 48_000;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid {field}: {reason}")]
pub struct ConfigError {
    pub field: &'static str,
    pub reason: String,
}

impl ConfigError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct OrchestratorConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub sync: SyncConfig,
}

impl OrchestratorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gateway.validate()?;
        self.session.validate()?;
        self.sync.validate()
    }
}

/// Backend connection settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GatewayConfig {
    /// Backend origin, e.g. `http://localhost:8000`. Endpoints live under `/api`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl GatewayConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let raw = self.base_url.trim();
        if raw.is_empty() {
            return Err(ConfigError::new("gateway.base_url", "must not be empty"));
        }

        let url = Url::parse(raw).map_err(|e| ConfigError::new("gateway.base_url", e.to_string()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::new(
                "gateway.base_url",
                format!("unsupported URL scheme: {}", url.scheme()),
            ));
        }
        if url.host().is_none() {
            return Err(ConfigError::new("gateway.base_url", "must have a host"));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::new(
                "gateway.request_timeout_secs",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

/// Call session settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Transport sample rate used when the caller does not name a configuration.
    #[serde(default = "default_sample_rate")]
    pub default_sample_rate: u32,

    /// Capacity of the notice broadcast channel. Slow observers past this lag.
    #[serde(default = "default_notice_buffer")]
    pub notice_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_sample_rate: default_sample_rate(),
            notice_buffer: default_notice_buffer(),
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.default_sample_rate) {
            return Err(ConfigError::new(
                "session.default_sample_rate",
                format!("must be between {MIN_SAMPLE_RATE} and {MAX_SAMPLE_RATE}"),
            ));
        }
        if self.notice_buffer == 0 {
            return Err(ConfigError::new(
                "session.notice_buffer",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

fn default_sample_rate() -> u32 {
    callops_protocol::DEFAULT_SAMPLE_RATE
}

fn default_notice_buffer() -> usize {
    16
}

/// Synchronizer settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SyncConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Delay policy after failed polls.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            retry: RetryConfig::default(),
        }
    }
}

impl SyncConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::new(
                "sync.poll_interval_ms",
                "must be greater than 0",
            ));
        }
        if let RetryConfig::Exponential { max_delay_ms } = self.retry {
            if max_delay_ms < self.poll_interval_ms {
                return Err(ConfigError::new(
                    "sync.retry.max_delay_ms",
                    "must not be shorter than the poll interval",
                ));
            }
        }
        Ok(())
    }
}

fn default_poll_interval_ms() -> u64 {
    15_000
}

/// Poll failure backoff.
///
/// ```yaml
/// retry: fixed
/// # or
/// retry:
///   exponential:
///     max_delay_ms: 120000
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryConfig {
    /// Keep polling at the regular interval.
    #[default]
    Fixed,
    /// Double the delay after each consecutive failure, up to `max_delay_ms`.
    Exponential { max_delay_ms: u64 },
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        match *self {
            RetryConfig::Fixed => RetryPolicy::Fixed,
            RetryConfig::Exponential { max_delay_ms } => RetryPolicy::Exponential {
                max_delay: Duration::from_millis(max_delay_ms),
            },
        }
    }
}
