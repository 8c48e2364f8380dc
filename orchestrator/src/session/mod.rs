//! Live call session orchestration.
//!
//! A [`CallSession`] drives one call attempt at a time through
//! [`CallSessionState`]. Session creation and transport start are separate
//! commands: a ticket sits in `Ready` until the caller explicitly starts the
//! transport, and its credential is consumed by the first start.
//!
//! All transitions run on a dedicated actor task. The handle is a thin command
//! sender; dropping it (or calling [`CallSession::shutdown`]) stops the actor and
//! closes any open transport.

mod actor;
mod state;

use std::sync::Arc;

use callops_protocol::{AgentConfiguration, CallSessionRequest};
use tokio::{
    sync::{broadcast, mpsc, oneshot, watch},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

pub(crate) use actor::SessionMessage;
pub use state::{CallSessionState, SessionNotice, TicketSummary};

use self::actor::SessionActor;
use crate::{
    config::SessionConfig,
    error::{SessionError, SessionResult},
    gateway::CallGateway,
    metrics::OrchestratorMetrics,
    transport::TransportClient,
};

/// Handle to a call session actor.
pub struct CallSession {
    tx: mpsc::UnboundedSender<SessionMessage>,
    state: watch::Receiver<CallSessionState>,
    notices: broadcast::Sender<SessionNotice>,
    default_sample_rate: u32,
    metrics: Arc<OrchestratorMetrics>,
    shutdown_token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl CallSession {
    /// Spawn a session actor. Must be called within a Tokio runtime.
    pub fn new(
        gateway: Arc<dyn CallGateway>,
        transport: Arc<dyn TransportClient>,
        config: &SessionConfig,
    ) -> Self {
        Self::with_metrics(
            gateway,
            transport,
            config,
            Arc::new(OrchestratorMetrics::new()),
        )
    }

    pub fn with_metrics(
        gateway: Arc<dyn CallGateway>,
        transport: Arc<dyn TransportClient>,
        config: &SessionConfig,
        metrics: Arc<OrchestratorMetrics>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(CallSessionState::Idle);
        let (notices, _) = broadcast::channel(config.notice_buffer.max(1));
        let shutdown_token = CancellationToken::new();

        let actor = SessionActor::new(
            gateway,
            transport,
            tx.clone(),
            state_tx,
            notices.clone(),
            Arc::clone(&metrics),
        );
        let task = tokio::spawn(actor.run(rx, shutdown_token.clone()));

        Self {
            tx,
            state: state_rx,
            notices,
            default_sample_rate: config.default_sample_rate,
            metrics,
            shutdown_token,
            task: Some(task),
        }
    }

    /// Request a new call session from the backend.
    ///
    /// Resolves once the backend answers. Invalid requests are rejected without a
    /// backend call and leave the state untouched. A submission while another
    /// attempt is in progress is rejected with [`SessionError::AttemptInProgress`].
    pub async fn submit(&self, request: CallSessionRequest) -> SessionResult<TicketSummary> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionMessage::Submit { request, reply })?;
        rx.await.map_err(|_| SessionError::Shutdown)?
    }

    /// Open the transport with the session's default sample rate.
    pub async fn start_transport(&self) -> SessionResult<()> {
        self.start_transport_with_rate(self.default_sample_rate).await
    }

    /// Open the transport at the sample rate from `configuration`'s voice settings.
    pub async fn start_transport_for(
        &self,
        configuration: &AgentConfiguration,
    ) -> SessionResult<()> {
        self.start_transport_with_rate(configuration.sample_rate())
            .await
    }

    /// Open the transport with the ready ticket's credential.
    ///
    /// Returns once the open command was issued; the transport's `started` event
    /// moves the session to `Active`. A second call for the same ticket fails with
    /// [`SessionError::StaleCredential`] and never reaches the transport.
    pub async fn start_transport_with_rate(&self, sample_rate: u32) -> SessionResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionMessage::StartTransport { sample_rate, reply })?;
        rx.await.map_err(|_| SessionError::Shutdown)?
    }

    /// Return a terminal session to `Idle`.
    pub async fn reset(&self) -> SessionResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionMessage::Reset { reply })?;
        rx.await.map_err(|_| SessionError::Shutdown)?
    }

    /// Abandon the current attempt and return to `Idle`. Never fails.
    ///
    /// An in-flight backend request is not cancelled; its result is discarded.
    pub async fn close(&self) {
        let (reply, rx) = oneshot::channel();
        if self.send(SessionMessage::Close { reply }).is_ok() {
            let _ = rx.await;
        }
    }

    pub fn state(&self) -> CallSessionState {
        self.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<CallSessionState> {
        self.state.clone()
    }

    /// Wait until the state satisfies `predicate`, returning the matching state.
    pub async fn wait_for<F>(&self, mut predicate: F) -> SessionResult<CallSessionState>
    where
        F: FnMut(&CallSessionState) -> bool,
    {
        let mut rx = self.state.clone();
        let state = rx
            .wait_for(|state| predicate(state))
            .await
            .map_err(|_| SessionError::Shutdown)?;
        Ok(state.clone())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionNotice> {
        self.notices.subscribe()
    }

    pub fn metrics(&self) -> &Arc<OrchestratorMetrics> {
        &self.metrics
    }

    /// Stop the actor and wait for it to release the transport.
    pub async fn shutdown(mut self) {
        self.shutdown_token.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    fn send(&self, message: SessionMessage) -> SessionResult<()> {
        self.tx.send(message).map_err(|_| SessionError::Shutdown)
    }
}

impl Drop for CallSession {
    fn drop(&mut self) {
        self.shutdown_token.cancel();
    }
}
