//! Call orchestration for the callops console.
//!
//! - [`CallSession`]: live call session state machine (request, transport, teardown)
//! - [`Synchronizer`]: polling reconciliation of backend call records
//! - [`CallGateway`]: backend access, over HTTP or in memory
//! - [`TransportClient`]: contract for the external real-time audio transport

pub mod config;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod session;
pub mod sync;
pub mod transport;

pub use config::{
    ConfigError, GatewayConfig, OrchestratorConfig, RetryConfig, SessionConfig, SyncConfig,
};
pub use error::{GatewayError, GatewayResult, SessionError, SessionResult, TransportError};
pub use gateway::{CallGateway, HttpGateway, MemoryGateway};
pub use metrics::{MetricsSnapshot, OrchestratorMetrics};
pub use session::{CallSession, CallSessionState, SessionNotice, TicketSummary};
pub use sync::{
    CallListSource, CallRecordSource, DashboardSource, PollHandle, PollPhase, PollSnapshot,
    PollSource, PollTarget, RetryPolicy, Synchronizer,
};
pub use transport::{NoopTransport, TransportClient, TransportEvent, TransportEventSink};
