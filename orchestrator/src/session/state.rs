use callops_protocol::{CallSessionTicket, SessionId};
use serde::Serialize;

/// Observer-safe view of an issued ticket. The credential itself never leaves
/// the session actor; only its preview does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketSummary {
    pub session_id: SessionId,
    pub initial_status: Option<String>,
    pub credential_preview: String,
}

impl From<&CallSessionTicket> for TicketSummary {
    fn from(ticket: &CallSessionTicket) -> Self {
        Self {
            session_id: ticket.session_id.clone(),
            initial_status: ticket.initial_status.clone(),
            credential_preview: ticket.access_credential.preview(),
        }
    }
}

/// Local lifecycle of one call attempt.
///
/// ```text
/// Idle -> Requesting -> Ready -> Connecting -> Active -> Ended
///            |            |           |          |
///            +------------+-----------+----------+--> Failed
/// ```
///
/// `Ended` and `Failed` are terminal; `reset` returns them to `Idle`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CallSessionState {
    Idle,
    Requesting,
    Ready(TicketSummary),
    /// Transport open was commanded; waiting for it to report `started`.
    Connecting { session_id: SessionId },
    Active { session_id: SessionId },
    Ended { session_id: SessionId },
    Failed { reason: String },
}

impl CallSessionState {
    pub fn name(&self) -> &'static str {
        match self {
            CallSessionState::Idle => "idle",
            CallSessionState::Requesting => "requesting",
            CallSessionState::Ready(_) => "ready",
            CallSessionState::Connecting { .. } => "connecting",
            CallSessionState::Active { .. } => "active",
            CallSessionState::Ended { .. } => "ended",
            CallSessionState::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CallSessionState::Ended { .. } | CallSessionState::Failed { .. }
        )
    }

    /// An attempt is underway and blocks new submissions.
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            CallSessionState::Requesting
                | CallSessionState::Ready(_)
                | CallSessionState::Connecting { .. }
                | CallSessionState::Active { .. }
        )
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            CallSessionState::Ready(ticket) => Some(&ticket.session_id),
            CallSessionState::Connecting { session_id }
            | CallSessionState::Active { session_id }
            | CallSessionState::Ended { session_id } => Some(session_id),
            CallSessionState::Idle
            | CallSessionState::Requesting
            | CallSessionState::Failed { .. } => None,
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            CallSessionState::Failed { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Broadcast to session observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    /// Backend issued a ticket.
    Created { session_id: SessionId },
    /// Transport ended naturally. Fires once per attempt.
    Completed { session_id: SessionId },
    Failed {
        session_id: Option<SessionId>,
        reason: String,
    },
}
