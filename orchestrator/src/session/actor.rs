//! The session actor owns the state machine. Commands from [`super::CallSession`],
//! gateway completions and transport events all arrive on one inbox and are
//! applied strictly in order.

use std::sync::Arc;

use callops_protocol::{AccessCredential, CallSessionRequest, CallSessionTicket};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::state::{CallSessionState, SessionNotice, TicketSummary};
use crate::{
    error::{GatewayResult, SessionError, SessionResult, TransportError},
    gateway::CallGateway,
    metrics::OrchestratorMetrics,
    transport::{TransportClient, TransportEvent, TransportEventSink},
};

#[derive(Debug)]
pub(crate) enum SessionMessage {
    Submit {
        request: CallSessionRequest,
        reply: oneshot::Sender<SessionResult<TicketSummary>>,
    },
    StartTransport {
        sample_rate: u32,
        reply: oneshot::Sender<SessionResult<()>>,
    },
    Reset {
        reply: oneshot::Sender<SessionResult<()>>,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
    /// Gateway round trip for `attempt` finished.
    TicketResolved {
        attempt: u64,
        result: GatewayResult<CallSessionTicket>,
    },
    /// Lifecycle event from transport connection `connection`.
    Transport {
        connection: u64,
        event: TransportEvent,
    },
}

pub(crate) struct SessionActor {
    gateway: Arc<dyn CallGateway>,
    transport: Arc<dyn TransportClient>,
    inbox: mpsc::UnboundedSender<SessionMessage>,
    state: watch::Sender<CallSessionState>,
    notices: broadcast::Sender<SessionNotice>,
    metrics: Arc<OrchestratorMetrics>,
    /// Bumped on every submit and close; gateway results for older attempts are dropped.
    attempt: u64,
    /// Bumped on every open and release; transport events for older connections are dropped.
    connection: u64,
    credential: Option<AccessCredential>,
    pending_submit: Option<oneshot::Sender<SessionResult<TicketSummary>>>,
    transport_open: bool,
}

impl SessionActor {
    pub(crate) fn new(
        gateway: Arc<dyn CallGateway>,
        transport: Arc<dyn TransportClient>,
        inbox: mpsc::UnboundedSender<SessionMessage>,
        state: watch::Sender<CallSessionState>,
        notices: broadcast::Sender<SessionNotice>,
        metrics: Arc<OrchestratorMetrics>,
    ) -> Self {
        Self {
            gateway,
            transport,
            inbox,
            state,
            notices,
            metrics,
            attempt: 0,
            connection: 0,
            credential: None,
            pending_submit: None,
            transport_open: false,
        }
    }

    pub(crate) async fn run(
        mut self,
        mut rx: mpsc::UnboundedReceiver<SessionMessage>,
        shutdown: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    debug!("Call session shutting down");
                    break;
                }
                message = rx.recv() => match message {
                    Some(message) => self.handle(message).await,
                    None => break,
                },
            }
        }
        self.teardown().await;
    }

    async fn handle(&mut self, message: SessionMessage) {
        match message {
            SessionMessage::Submit { request, reply } => self.submit(request, reply).await,
            SessionMessage::StartTransport { sample_rate, reply } => {
                let result = self.start_transport(sample_rate).await;
                let _ = reply.send(result);
            }
            SessionMessage::Reset { reply } => {
                let result = self.reset().await;
                let _ = reply.send(result);
            }
            SessionMessage::Close { reply } => {
                self.close().await;
                let _ = reply.send(());
            }
            SessionMessage::TicketResolved { attempt, result } => {
                self.ticket_resolved(attempt, result)
            }
            SessionMessage::Transport { connection, event } => {
                self.transport_event(connection, event).await
            }
        }
    }

    fn current(&self) -> CallSessionState {
        self.state.borrow().clone()
    }

    fn transition(&self, next: CallSessionState) {
        let previous = self.state.send_replace(next);
        debug!(
            from = previous.name(),
            to = self.state.borrow().name(),
            "Call session transition"
        );
    }

    fn notify(&self, notice: SessionNotice) {
        // No subscribers is fine.
        let _ = self.notices.send(notice);
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    async fn submit(
        &mut self,
        request: CallSessionRequest,
        reply: oneshot::Sender<SessionResult<TicketSummary>>,
    ) {
        if let Err(err) = request.validate() {
            debug!(field = err.field().wire_name(), "Rejected call request");
            self.metrics.record_validation_rejected();
            let _ = reply.send(Err(err.into()));
            return;
        }

        let current = self.current();
        if current.is_in_progress() {
            let _ = reply.send(Err(SessionError::AttemptInProgress {
                state: current.name(),
            }));
            return;
        }

        // Idle, Ended or Failed: start a fresh attempt.
        self.release_transport().await;
        self.credential = None;
        self.attempt += 1;
        self.pending_submit = Some(reply);
        self.transition(CallSessionState::Requesting);
        self.metrics.record_session_requested();

        info!(
            configuration = %request.configuration_id,
            driver = %request.driver_name,
            load = %request.load_number,
            attempt = self.attempt,
            "Requesting call session"
        );

        let attempt = self.attempt;
        let gateway = Arc::clone(&self.gateway);
        let inbox = self.inbox.clone();
        tokio::spawn(async move {
            let result = gateway.create_call_session(&request).await;
            // The session may be gone by now; the result is simply dropped.
            let _ = inbox.send(SessionMessage::TicketResolved { attempt, result });
        });
    }

    async fn start_transport(&mut self, sample_rate: u32) -> SessionResult<()> {
        let session_id = match self.current() {
            CallSessionState::Ready(ticket) => ticket.session_id,
            CallSessionState::Connecting { session_id }
            | CallSessionState::Active { session_id }
            | CallSessionState::Ended { session_id } => {
                warn!(%session_id, "Transport start requested with an already used credential");
                self.metrics.record_stale_credential();
                return Err(SessionError::StaleCredential { session_id });
            }
            other => {
                return Err(SessionError::InvalidTransition {
                    action: "start transport",
                    state: other.name(),
                })
            }
        };

        let Some(credential) = self.credential.take() else {
            warn!(%session_id, "Ready session has no credential");
            self.metrics.record_stale_credential();
            return Err(SessionError::StaleCredential { session_id });
        };

        self.connection += 1;
        let events = TransportEventSink::new(self.connection, self.inbox.clone());
        self.transport_open = true;
        self.metrics.record_transport_opened();
        self.transition(CallSessionState::Connecting {
            session_id: session_id.clone(),
        });

        info!(%session_id, sample_rate, connection = self.connection, "Opening transport");
        match self.transport.open(&credential, sample_rate, events).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.fail_transport(err.clone()).await;
                Err(SessionError::Transport(err))
            }
        }
    }

    async fn reset(&mut self) -> SessionResult<()> {
        match self.current() {
            CallSessionState::Idle => Ok(()),
            CallSessionState::Ended { .. } | CallSessionState::Failed { .. } => {
                self.release_transport().await;
                self.credential = None;
                self.transition(CallSessionState::Idle);
                Ok(())
            }
            other => Err(SessionError::InvalidTransition {
                action: "reset",
                state: other.name(),
            }),
        }
    }

    async fn close(&mut self) {
        let current = self.current();
        if !current.is_in_progress() {
            return;
        }

        info!(state = current.name(), "Abandoning call attempt");
        self.release_transport().await;
        self.credential = None;
        self.attempt += 1;
        if let Some(reply) = self.pending_submit.take() {
            let _ = reply.send(Err(SessionError::Abandoned));
        }
        self.transition(CallSessionState::Idle);
    }

    // ------------------------------------------------------------------------
    // Completions
    // ------------------------------------------------------------------------

    fn ticket_resolved(&mut self, attempt: u64, result: GatewayResult<CallSessionTicket>) {
        if attempt != self.attempt || self.current() != CallSessionState::Requesting {
            debug!(attempt, current = self.attempt, "Discarding stale session ticket");
            return;
        }
        let reply = self.pending_submit.take();

        let outcome = match result {
            Ok(ticket) if ticket.access_credential.is_empty() => {
                Err(SessionError::MissingCredential)
            }
            Ok(ticket) => Ok(ticket),
            Err(err) => Err(SessionError::Gateway(err)),
        };

        match outcome {
            Ok(ticket) => {
                let summary = TicketSummary::from(&ticket);
                info!(
                    session_id = %summary.session_id,
                    status = summary.initial_status.as_deref().unwrap_or(""),
                    "Call session ready"
                );
                self.credential = Some(ticket.access_credential);
                self.metrics.record_session_ready();
                self.transition(CallSessionState::Ready(summary.clone()));
                self.notify(SessionNotice::Created {
                    session_id: summary.session_id.clone(),
                });
                if let Some(reply) = reply {
                    let _ = reply.send(Ok(summary));
                }
            }
            Err(err) => {
                let reason = err.to_string();
                warn!(%reason, "Call session request failed");
                self.metrics.record_session_failed();
                self.transition(CallSessionState::Failed {
                    reason: reason.clone(),
                });
                self.notify(SessionNotice::Failed {
                    session_id: None,
                    reason,
                });
                if let Some(reply) = reply {
                    let _ = reply.send(Err(err));
                }
            }
        }
    }

    async fn transport_event(&mut self, connection: u64, event: TransportEvent) {
        if connection != self.connection || !self.transport_open {
            debug!(connection, ?event, "Ignoring event from released transport");
            return;
        }

        match (event, self.current()) {
            (TransportEvent::Started, CallSessionState::Connecting { session_id }) => {
                info!(%session_id, "Transport started");
                self.transition(CallSessionState::Active { session_id });
            }
            (
                TransportEvent::Ended,
                CallSessionState::Connecting { session_id }
                | CallSessionState::Active { session_id },
            ) => {
                info!(%session_id, "Call ended");
                self.release_transport().await;
                self.metrics.record_session_completed();
                self.transition(CallSessionState::Ended {
                    session_id: session_id.clone(),
                });
                self.notify(SessionNotice::Completed { session_id });
            }
            (TransportEvent::Error(err), _) => self.fail_transport(err).await,
            (event, state) => {
                debug!(?event, state = state.name(), "Ignoring unexpected transport event");
            }
        }
    }

    async fn fail_transport(&mut self, err: TransportError) {
        let session_id = self.current().session_id().cloned();
        warn!(session_id = ?session_id, error = %err, "Transport failed");
        self.release_transport().await;
        self.metrics.record_session_failed();
        self.transition(CallSessionState::Failed {
            reason: err.message().to_string(),
        });
        self.notify(SessionNotice::Failed {
            session_id,
            reason: err.message().to_string(),
        });
    }

    /// Close the open transport connection, if any. Later events from it are ignored.
    async fn release_transport(&mut self) {
        if !self.transport_open {
            return;
        }
        self.transport_open = false;
        self.connection += 1;
        self.transport.close().await;
        self.metrics.record_transport_closed();
        debug!("Transport released");
    }

    async fn teardown(&mut self) {
        self.release_transport().await;
        self.credential = None;
        if let Some(reply) = self.pending_submit.take() {
            let _ = reply.send(Err(SessionError::Shutdown));
        }
    }
}
