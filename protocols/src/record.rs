//! Call records as returned by `GET /api/calls` and `GET /api/calls/{id}`.
//!
//! Records are owned by the backend. Clients only ever replace a cached copy
//! wholesale; [`CallRecord::is_superseded_by`] decides whether a freshly fetched
//! copy may do so.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{CallId, ConfigurationId};

/// Backend status of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    /// Any label this client does not know about.
    #[serde(other)]
    Unknown,
}

impl CallStatus {
    /// `Completed` and `Failed` never change once reached.
    pub fn is_terminal(self) -> bool {
        matches!(self, CallStatus::Completed | CallStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CallStatus::Pending => "pending",
            CallStatus::InProgress => "in_progress",
            CallStatus::Completed => "completed",
            CallStatus::Failed => "failed",
            CallStatus::Unknown => "unknown",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CallStatus::Pending => "Pending",
            CallStatus::InProgress => "In Progress",
            CallStatus::Completed => "Completed",
            CallStatus::Failed => "Failed",
            CallStatus::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to the configuration a call was placed with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfigRef {
    #[serde(default)]
    pub id: Option<ConfigurationId>,
    pub name: String,
    /// Only present on the detail endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Only present on the detail endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_message: Option<String>,
}

/// The backend's authoritative record of one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    pub id: CallId,
    /// Call id assigned by the voice provider, once known.
    #[serde(rename = "retell_call_id", default)]
    pub provider_call_id: Option<String>,
    pub status: CallStatus,
    /// Present once the call has completed.
    #[serde(default)]
    pub transcript: Option<String>,
    /// Scenario-specific extracted fields. Opaque to the orchestrator.
    #[serde(default)]
    pub structured_data: Option<Value>,
    pub driver_name: String,
    pub load_number: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub agent_config: Option<AgentConfigRef>,
}

impl CallRecord {
    /// Latest known modification time.
    pub fn revision(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or(self.created_at)
    }

    /// Whether `fresh` may replace this copy in a cache.
    ///
    /// A snapshot with an older revision is always rejected. A terminal record is
    /// only replaced by a non-terminal one when the latter carries a strictly newer
    /// revision.
    pub fn is_superseded_by(&self, fresh: &CallRecord) -> bool {
        let current = self.revision();
        let next = fresh.revision();

        if let (Some(current), Some(next)) = (current, next) {
            if next < current {
                return false;
            }
        }

        if self.status.is_terminal() && !fresh.status.is_terminal() {
            return matches!((current, next), (Some(c), Some(n)) if n > c);
        }

        true
    }

    /// `structured_data.emergency_detected == true`.
    pub fn emergency_detected(&self) -> bool {
        self.structured_data
            .as_ref()
            .and_then(|data| data.get("emergency_detected"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn configuration_name(&self) -> &str {
        self.agent_config
            .as_ref()
            .map(|config| config.name.as_str())
            .unwrap_or("Unknown")
    }
}
