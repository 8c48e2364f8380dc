//! Data model for the callops driver-call console.
//!
//! - [`session`]: call session request, validation and the issued ticket
//! - [`record`]: backend call records and their status
//! - [`configuration`]: agent configurations (read-only)
//! - [`dashboard`]: summary derived from records and configurations

pub mod configuration;
pub mod dashboard;
pub mod display;
pub mod ids;
pub mod record;
pub mod session;

pub use configuration::{find_configuration, AgentConfiguration, VoiceSettings, DEFAULT_SAMPLE_RATE};
pub use dashboard::{DashboardStats, DashboardSummary, RECENT_CALLS};
pub use display::{format_duration, format_status};
pub use ids::{CallId, ConfigurationId, SessionId};
pub use record::{AgentConfigRef, CallRecord, CallStatus};
pub use session::{
    AccessCredential, CallSessionRequest, CallSessionTicket, RequestField, ValidationError,
};
