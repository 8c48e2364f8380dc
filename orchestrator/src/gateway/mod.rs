//! Backend gateway.
//!
//! [`CallGateway`] is the only path from the orchestrator to the backend. Two
//! implementations ship with the crate:
//!
//! - [`HttpGateway`]: JSON over HTTP against the `/api` endpoints
//! - [`MemoryGateway`]: scripted in-process backend for tests and demos

mod http;
mod memory;

use async_trait::async_trait;
use callops_protocol::{
    AgentConfiguration, CallId, CallRecord, CallSessionRequest, CallSessionTicket,
};

pub use http::HttpGateway;
pub use memory::MemoryGateway;

use crate::error::GatewayResult;

/// Request/response access to the call backend.
///
/// Implementations must be cheap to share; the session actor and every poller
/// hold the same `Arc<dyn CallGateway>`.
#[async_trait]
pub trait CallGateway: Send + Sync + 'static {
    /// `POST /api/calls/trigger`
    async fn create_call_session(
        &self,
        request: &CallSessionRequest,
    ) -> GatewayResult<CallSessionTicket>;

    /// `GET /api/calls/{id}`
    async fn get_call_record(&self, id: &CallId) -> GatewayResult<CallRecord>;

    /// `GET /api/calls`, newest first.
    async fn list_call_records(&self) -> GatewayResult<Vec<CallRecord>>;

    /// `GET /api/configurations`
    async fn list_configurations(&self) -> GatewayResult<Vec<AgentConfiguration>>;
}
