//! What a poller fetches and how a fresh response folds into its cache.

use std::fmt;

use async_trait::async_trait;
use callops_protocol::{CallId, CallRecord, DashboardSummary};

use crate::{error::GatewayResult, gateway::CallGateway};

/// Identifies what a poller is watching.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PollTarget {
    CallList,
    CallRecord(CallId),
    Dashboard,
}

impl fmt::Display for PollTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollTarget::CallList => f.write_str("calls"),
            PollTarget::CallRecord(id) => write!(f, "calls/{id}"),
            PollTarget::Dashboard => f.write_str("dashboard"),
        }
    }
}

/// A pollable view over the backend.
#[async_trait]
pub trait PollSource: Send + Sync + 'static {
    type Output: Clone + PartialEq + Send + Sync + 'static;

    fn target(&self) -> PollTarget;

    async fn fetch(&self, gateway: &dyn CallGateway) -> GatewayResult<Self::Output>;

    /// Fold a fresh response into the cached value. Wholesale replacement by default.
    fn reconcile(&self, current: Option<&Self::Output>, fresh: Self::Output) -> Self::Output {
        let _ = current;
        fresh
    }

    /// Value to show when the very first fetch fails. `None` makes that failure
    /// terminal: the poller reports the view as unavailable and stops.
    fn initial_failure_fallback(&self) -> Option<Self::Output> {
        None
    }
}

/// Every call record, newest first. An unreachable backend on first load shows
/// an empty list and keeps polling.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallListSource;

#[async_trait]
impl PollSource for CallListSource {
    type Output = Vec<CallRecord>;

    fn target(&self) -> PollTarget {
        PollTarget::CallList
    }

    async fn fetch(&self, gateway: &dyn CallGateway) -> GatewayResult<Self::Output> {
        gateway.list_call_records().await
    }

    /// Take the server's list, but keep a cached record wherever the fresh copy
    /// is an older snapshot of it.
    fn reconcile(&self, current: Option<&Self::Output>, fresh: Self::Output) -> Self::Output {
        let Some(current) = current else {
            return fresh;
        };
        fresh
            .into_iter()
            .map(|record| match current.iter().find(|c| c.id == record.id) {
                Some(cached) if !cached.is_superseded_by(&record) => cached.clone(),
                _ => record,
            })
            .collect()
    }

    fn initial_failure_fallback(&self) -> Option<Self::Output> {
        Some(Vec::new())
    }
}

/// A single call record. Failing to load it the first time is terminal.
#[derive(Debug, Clone)]
pub struct CallRecordSource {
    id: CallId,
}

impl CallRecordSource {
    pub fn new(id: impl Into<CallId>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &CallId {
        &self.id
    }
}

#[async_trait]
impl PollSource for CallRecordSource {
    type Output = CallRecord;

    fn target(&self) -> PollTarget {
        PollTarget::CallRecord(self.id.clone())
    }

    async fn fetch(&self, gateway: &dyn CallGateway) -> GatewayResult<Self::Output> {
        gateway.get_call_record(&self.id).await
    }

    fn reconcile(&self, current: Option<&Self::Output>, fresh: Self::Output) -> Self::Output {
        match current {
            Some(cached) if !cached.is_superseded_by(&fresh) => cached.clone(),
            _ => fresh,
        }
    }
}

/// Dashboard summary built from the record list and configurations.
#[derive(Debug, Clone, Copy, Default)]
pub struct DashboardSource;

#[async_trait]
impl PollSource for DashboardSource {
    type Output = DashboardSummary;

    fn target(&self) -> PollTarget {
        PollTarget::Dashboard
    }

    async fn fetch(&self, gateway: &dyn CallGateway) -> GatewayResult<Self::Output> {
        let (records, configurations) =
            futures::try_join!(gateway.list_call_records(), gateway.list_configurations())?;
        Ok(DashboardSummary::new(&records, configurations))
    }

    fn initial_failure_fallback(&self) -> Option<Self::Output> {
        Some(DashboardSummary::default())
    }
}
