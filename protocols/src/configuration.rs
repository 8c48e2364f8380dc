//! Agent configurations as returned by `GET /api/configurations`.
//!
//! Editing configurations is not handled here; the orchestrator reads only the
//! transport sample rate out of them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value};

use crate::ids::ConfigurationId;

/// Sample rate used when a configuration does not specify one.
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VoiceSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    /// Remaining provider-specific settings, passed through untouched.
    #[serde(flatten)]
    pub extra: JsonMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfiguration {
    pub id: ConfigurationId,
    pub name: String,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub initial_message: String,
    #[serde(default)]
    pub voice_settings: Option<VoiceSettings>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl AgentConfiguration {
    /// Transport sample rate for calls placed with this configuration.
    pub fn sample_rate(&self) -> u32 {
        self.voice_settings
            .as_ref()
            .and_then(|settings| settings.sample_rate)
            .filter(|rate| *rate > 0)
            .unwrap_or(DEFAULT_SAMPLE_RATE)
    }
}

/// Find a configuration by id.
pub fn find_configuration<'a>(
    configurations: &'a [AgentConfiguration],
    id: &ConfigurationId,
) -> Option<&'a AgentConfiguration> {
    configurations.iter().find(|config| &config.id == id)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn sample_rate_defaults_when_missing() {
        let config: AgentConfiguration = serde_json::from_value(json!({
            "id": "cfg-1",
            "name": "Check-in",
            "system_prompt": "You are a dispatcher.",
            "initial_message": "Hi {driver_name}",
            "voice_settings": {"voice_id": "11labs-Adrian", "responsiveness": 1}
        }))
        .unwrap();
        assert_eq!(config.sample_rate(), DEFAULT_SAMPLE_RATE);

        let settings = config.voice_settings.as_ref().unwrap();
        assert_eq!(settings.voice_id.as_deref(), Some("11labs-Adrian"));
        assert_eq!(settings.extra["responsiveness"], 1);
    }

    #[test]
    fn sample_rate_read_from_voice_settings() {
        let config: AgentConfiguration = serde_json::from_value(json!({
            "id": "cfg-2",
            "name": "Emergency",
            "voice_settings": {"sample_rate": 16000}
        }))
        .unwrap();
        assert_eq!(config.sample_rate(), 16_000);
    }

    #[test]
    fn find_configuration_by_id() {
        let configs: Vec<AgentConfiguration> = serde_json::from_value(json!([
            {"id": "a", "name": "A"},
            {"id": "b", "name": "B"}
        ]))
        .unwrap();
        let found = find_configuration(&configs, &ConfigurationId::new("b")).unwrap();
        assert_eq!(found.name, "B");
        assert!(find_configuration(&configs, &ConfigurationId::new("z")).is_none());
    }
}
