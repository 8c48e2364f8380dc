//! Call record synchronizer.
//!
//! Keeps per-view caches of backend state fresh by polling. Every view gets its
//! own poller with its own interval, cache slot and cancellation; views never
//! share or lock each other's caches.

mod poller;
mod retry;
mod source;

pub use poller::{PollHandle, PollPhase, PollSnapshot, Synchronizer};
pub use retry::RetryPolicy;
pub use source::{CallListSource, CallRecordSource, DashboardSource, PollSource, PollTarget};
