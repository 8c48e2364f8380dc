//! Orchestrator error types.
//!
//! Defines error variants for gateway round trips, the real-time transport, and
//! call session commands.

use callops_protocol::{SessionId, ValidationError};
use thiserror::Error;

pub type GatewayResult<T> = Result<T, GatewayError>;
pub type SessionResult<T> = Result<T, SessionError>;

/// Backend round-trip failures.
///
/// `Display` yields the human-readable reason shown to operators.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Backend answered with a non-success status.
    #[error("{detail}")]
    Status { status: u16, detail: String },

    #[error("Invalid backend response: {0}")]
    Decode(String),

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl GatewayError {
    pub fn status(status: u16, detail: impl Into<String>) -> Self {
        Self::Status {
            status,
            detail: detail.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::Status { status: 404, .. })
    }
}

/// Failure reported by the real-time transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Rejections and failures surfaced by [`crate::CallSession`] commands.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Call failed: {0}")]
    Transport(#[from] TransportError),

    /// Backend issued a ticket without an access credential.
    #[error("Access token is not available")]
    MissingCredential,

    /// The ticket's access credential was already handed to the transport.
    #[error("Access credential for session {session_id} was already used")]
    StaleCredential { session_id: SessionId },

    #[error("A call attempt is already {state}")]
    AttemptInProgress { state: &'static str },

    #[error("Cannot {action} while the session is {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    /// The attempt was closed before the backend answered; its result was discarded.
    #[error("Call attempt was abandoned")]
    Abandoned,

    #[error("Call session has shut down")]
    Shutdown,
}
