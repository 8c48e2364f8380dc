use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use callops_protocol::{
    AgentConfigRef, AgentConfiguration, CallId, CallRecord, CallSessionRequest,
    CallSessionTicket, CallStatus,
};
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::CallGateway;
use crate::error::{GatewayError, GatewayResult};

#[derive(Default)]
struct MemoryState {
    records: Vec<CallRecord>,
    configurations: Vec<AgentConfiguration>,
    scripted_tickets: VecDeque<GatewayResult<CallSessionTicket>>,
    unavailable: Option<String>,
    session_gate: Option<Arc<Notify>>,
}

/// In-process [`CallGateway`] with scriptable responses.
///
/// Session creation hands out `session-{n}` / `token-{n}` tickets unless a
/// response was queued with [`push_ticket`](Self::push_ticket) or
/// [`fail_next_session`](Self::fail_next_session). Each issued ticket adds an
/// `in_progress` record so list and detail reads see the new call.
#[derive(Default)]
pub struct MemoryGateway {
    state: Mutex<MemoryState>,
    next_session: AtomicU64,
    session_calls: AtomicU64,
    record_calls: AtomicU64,
    list_calls: AtomicU64,
    configuration_calls: AtomicU64,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_configurations(configurations: Vec<AgentConfiguration>) -> Self {
        let gateway = Self::new();
        gateway.set_configurations(configurations);
        gateway
    }

    pub fn set_configurations(&self, configurations: Vec<AgentConfiguration>) {
        self.state.lock().configurations = configurations;
    }

    /// Replace all records. Order is preserved as given (newest first by convention).
    pub fn set_records(&self, records: Vec<CallRecord>) {
        self.state.lock().records = records;
    }

    /// Insert or replace a single record by id.
    pub fn set_record(&self, record: CallRecord) {
        let mut state = self.state.lock();
        match state.records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => state.records.insert(0, record),
        }
    }

    pub fn record(&self, id: &CallId) -> Option<CallRecord> {
        self.state.lock().records.iter().find(|r| &r.id == id).cloned()
    }

    /// Queue the response for the next session creation.
    pub fn push_ticket(&self, ticket: CallSessionTicket) {
        self.state.lock().scripted_tickets.push_back(Ok(ticket));
    }

    /// Make the next session creation fail with `status` and `detail`.
    pub fn fail_next_session(&self, status: u16, detail: impl Into<String>) {
        self.state
            .lock()
            .scripted_tickets
            .push_back(Err(GatewayError::status(status, detail)));
    }

    /// Fail every call with [`GatewayError::Unavailable`] until cleared with `None`.
    pub fn set_unavailable(&self, reason: Option<String>) {
        self.state.lock().unavailable = reason;
    }

    /// Block session creation until the returned handle is notified.
    ///
    /// Each creation consumes one `notify_one` permit.
    pub fn hold_session_creation(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.lock().session_gate = Some(gate.clone());
        gate
    }

    pub fn release_session_creation(&self) {
        if let Some(gate) = self.state.lock().session_gate.take() {
            gate.notify_waiters();
            gate.notify_one();
        }
    }

    pub fn session_calls(&self) -> u64 {
        self.session_calls.load(Ordering::Relaxed)
    }

    pub fn record_calls(&self) -> u64 {
        self.record_calls.load(Ordering::Relaxed)
    }

    pub fn list_calls(&self) -> u64 {
        self.list_calls.load(Ordering::Relaxed)
    }

    pub fn configuration_calls(&self) -> u64 {
        self.configuration_calls.load(Ordering::Relaxed)
    }

    fn check_available(&self) -> GatewayResult<()> {
        match &self.state.lock().unavailable {
            Some(reason) => Err(GatewayError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }

    fn issue_ticket(&self, request: &CallSessionRequest) -> GatewayResult<CallSessionTicket> {
        let mut state = self.state.lock();
        let ticket = match state.scripted_tickets.pop_front() {
            Some(scripted) => scripted?,
            None => {
                let n = self.next_session.fetch_add(1, Ordering::Relaxed) + 1;
                CallSessionTicket::new(
                    format!("session-{n}"),
                    format!("token-{n}"),
                    Some("initiated".to_string()),
                )
            }
        };

        let config_name = state
            .configurations
            .iter()
            .find(|c| c.id == request.configuration_id)
            .map(|c| c.name.clone())
            .unwrap_or_default();
        let record = CallRecord {
            id: CallId::from(ticket.session_id.clone()),
            provider_call_id: Some(ticket.session_id.to_string()),
            status: CallStatus::InProgress,
            transcript: None,
            structured_data: None,
            driver_name: request.driver_name.clone(),
            load_number: request.load_number.clone(),
            created_at: None,
            updated_at: None,
            duration_ms: None,
            agent_config: Some(AgentConfigRef {
                id: Some(request.configuration_id.clone()),
                name: config_name,
                system_prompt: None,
                initial_message: None,
            }),
        };
        state.records.retain(|r| r.id != record.id);
        state.records.insert(0, record);

        Ok(ticket)
    }
}

#[async_trait]
impl CallGateway for MemoryGateway {
    async fn create_call_session(
        &self,
        request: &CallSessionRequest,
    ) -> GatewayResult<CallSessionTicket> {
        self.session_calls.fetch_add(1, Ordering::Relaxed);

        let gate = self.state.lock().session_gate.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.check_available()?;
        self.issue_ticket(request)
    }

    async fn get_call_record(&self, id: &CallId) -> GatewayResult<CallRecord> {
        self.record_calls.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;
        self.record(id)
            .ok_or_else(|| GatewayError::status(404, "Call not found"))
    }

    async fn list_call_records(&self) -> GatewayResult<Vec<CallRecord>> {
        self.list_calls.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;
        Ok(self.state.lock().records.clone())
    }

    async fn list_configurations(&self) -> GatewayResult<Vec<AgentConfiguration>> {
        self.configuration_calls.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;
        Ok(self.state.lock().configurations.clone())
    }
}

#[cfg(test)]
mod tests {
    use callops_protocol::ConfigurationId;

    use super::*;

    fn request() -> CallSessionRequest {
        CallSessionRequest::new(ConfigurationId::new("cfg-1"), "Mike", "L-100")
    }

    #[tokio::test]
    async fn test_issues_sequential_tickets_and_records() {
        let gateway = MemoryGateway::new();
        let first = gateway.create_call_session(&request()).await.unwrap();
        let second = gateway.create_call_session(&request()).await.unwrap();

        assert_eq!(first.session_id.as_str(), "session-1");
        assert_eq!(second.access_credential.expose(), "token-2");
        assert_eq!(gateway.session_calls(), 2);

        let records = gateway.list_call_records().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id.as_str(), "session-2");
        assert_eq!(records[0].status, CallStatus::InProgress);
    }

    #[tokio::test]
    async fn test_scripted_failure_then_default() {
        let gateway = MemoryGateway::new();
        gateway.fail_next_session(404, "Configuration not found");

        let err = gateway.create_call_session(&request()).await.unwrap_err();
        assert_eq!(err.to_string(), "Configuration not found");
        assert!(gateway.list_call_records().await.unwrap().is_empty());

        assert!(gateway.create_call_session(&request()).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_record_is_not_found() {
        let gateway = MemoryGateway::new();
        let err = gateway
            .get_call_record(&CallId::new("missing"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_unavailable_fails_reads() {
        let gateway = MemoryGateway::new();
        gateway.set_unavailable(Some("connection refused".to_string()));
        assert!(matches!(
            gateway.list_configurations().await,
            Err(GatewayError::Unavailable(_))
        ));

        gateway.set_unavailable(None);
        assert!(gateway.list_configurations().await.is_ok());
    }
}
