//! Call session request and the ticket the backend issues for it.
//!
//! Wire shape matches the backend's `POST /api/calls/trigger` endpoint:
//!
//! ```json
//! // request
//! {"agent_config_id": "cfg-1", "driver_name": "Bilal Ahmed", "load_number": "4556-B"}
//! // response
//! {"call_id": "s1", "access_token": "tok-abc", "status": "registered"}
//! ```

use serde::{Deserialize, Serialize};

use crate::ids::{ConfigurationId, SessionId};

/// Number of credential characters shown by [`AccessCredential::preview`].
const CREDENTIAL_PREVIEW_CHARS: usize = 20;

// ============================================================================
// Request
// ============================================================================

/// Input for creating a call session. All three fields are required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSessionRequest {
    #[serde(rename = "agent_config_id")]
    pub configuration_id: ConfigurationId,
    pub driver_name: String,
    pub load_number: String,
}

impl CallSessionRequest {
    pub fn new(
        configuration_id: impl Into<ConfigurationId>,
        driver_name: impl Into<String>,
        load_number: impl Into<String>,
    ) -> Self {
        Self {
            configuration_id: configuration_id.into(),
            driver_name: driver_name.into(),
            load_number: load_number.into(),
        }
    }

    /// Check that every field is present. Blank (whitespace-only) values count as
    /// missing. Reports the first missing field in declaration order.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.missing_fields().first() {
            Some(field) => Err(ValidationError::MissingField { field: *field }),
            None => Ok(()),
        }
    }

    /// Every missing field, in declaration order.
    pub fn missing_fields(&self) -> Vec<RequestField> {
        [
            (RequestField::ConfigurationId, self.configuration_id.as_str()),
            (RequestField::DriverName, self.driver_name.as_str()),
            (RequestField::LoadNumber, self.load_number.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect()
    }
}

/// Fields of a [`CallSessionRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestField {
    ConfigurationId,
    DriverName,
    LoadNumber,
}

impl RequestField {
    /// JSON field name used on the wire.
    pub fn wire_name(self) -> &'static str {
        match self {
            RequestField::ConfigurationId => "agent_config_id",
            RequestField::DriverName => "driver_name",
            RequestField::LoadNumber => "load_number",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RequestField::ConfigurationId => "agent configuration",
            RequestField::DriverName => "driver name",
            RequestField::LoadNumber => "load number",
        }
    }
}

impl std::fmt::Display for RequestField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Rejection of a request before any network call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    MissingField { field: RequestField },
}

impl ValidationError {
    pub fn field(&self) -> RequestField {
        match self {
            ValidationError::MissingField { field } => *field,
        }
    }
}

// ============================================================================
// Ticket
// ============================================================================

/// Single-use token authorizing exactly one transport connection.
///
/// `Debug` never prints the token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessCredential(String);

impl AccessCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for handing to the transport client only.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First characters of the token followed by `...`, for operator display.
    pub fn preview(&self) -> String {
        let head: String = self.0.chars().take(CREDENTIAL_PREVIEW_CHARS).collect();
        format!("{head}...")
    }
}

impl std::fmt::Debug for AccessCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessCredential(<redacted>)")
    }
}

/// Server-issued result of a successful session creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSessionTicket {
    #[serde(rename = "call_id")]
    pub session_id: SessionId,
    #[serde(rename = "access_token")]
    pub access_credential: AccessCredential,
    /// Status label at issuance time. Informational only.
    #[serde(rename = "status", default, skip_serializing_if = "Option::is_none")]
    pub initial_status: Option<String>,
}

impl CallSessionTicket {
    pub fn new(
        session_id: impl Into<SessionId>,
        access_credential: impl Into<String>,
        initial_status: Option<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            access_credential: AccessCredential::new(access_credential),
            initial_status,
        }
    }
}
