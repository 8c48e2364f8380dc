//! Real-time audio transport contract.
//!
//! The transport itself lives outside this crate. A [`TransportClient`] opens one
//! audio channel per access credential and reports its lifecycle through the
//! [`TransportEventSink`] it was handed in [`open`](TransportClient::open). Each
//! sink is bound to a single connection: events from a connection the session
//! has already released are dropped by the session.

use async_trait::async_trait;
use callops_protocol::AccessCredential;
use tokio::sync::mpsc;

use crate::{error::TransportError, session::SessionMessage};

/// Lifecycle events of one transport connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Started,
    Ended,
    Error(TransportError),
}

/// Control surface of a real-time audio transport.
#[async_trait]
pub trait TransportClient: Send + Sync + 'static {
    /// Open a channel with `credential`.
    ///
    /// Returning `Ok` means the request was accepted, not that the channel is up;
    /// the outcome arrives as [`TransportEvent::Started`] or
    /// [`TransportEvent::Error`] on `events`. A synchronous `Err` is treated as an
    /// error event.
    async fn open(
        &self,
        credential: &AccessCredential,
        sample_rate: u32,
        events: TransportEventSink,
    ) -> Result<(), TransportError>;

    /// Close the current channel. Closing a closed or never-opened channel is a no-op.
    async fn close(&self);
}

/// Event sink bound to one transport connection.
#[derive(Debug, Clone)]
pub struct TransportEventSink {
    connection: u64,
    tx: mpsc::UnboundedSender<SessionMessage>,
}

impl TransportEventSink {
    pub(crate) fn new(connection: u64, tx: mpsc::UnboundedSender<SessionMessage>) -> Self {
        Self { connection, tx }
    }

    pub fn connection(&self) -> u64 {
        self.connection
    }

    /// Deliver an event. Returns `false` once the owning session is gone.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.tx
            .send(SessionMessage::Transport {
                connection: self.connection,
                event,
            })
            .is_ok()
    }

    pub fn started(&self) -> bool {
        self.emit(TransportEvent::Started)
    }

    pub fn ended(&self) -> bool {
        self.emit(TransportEvent::Ended)
    }

    pub fn error(&self, message: impl Into<String>) -> bool {
        self.emit(TransportEvent::Error(TransportError::new(message)))
    }
}

/// Transport that accepts every command and never emits events.
///
/// Used when only the session-creation half of the flow is needed, e.g. from
/// the command line where no audio device is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTransport;

#[async_trait]
impl TransportClient for NoopTransport {
    async fn open(
        &self,
        _credential: &AccessCredential,
        _sample_rate: u32,
        _events: TransportEventSink,
    ) -> Result<(), TransportError> {
        Ok(())
    }

    async fn close(&self) {}
}
