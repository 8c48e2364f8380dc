//! Counters for session and synchronizer activity.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics shared by [`crate::CallSession`] and [`crate::Synchronizer`].
#[derive(Debug)]
pub struct OrchestratorMetrics {
    // Session metrics
    sessions_requested: AtomicU64,
    sessions_ready: AtomicU64,
    sessions_failed: AtomicU64,
    sessions_completed: AtomicU64,
    validation_rejections: AtomicU64,
    stale_credential_rejections: AtomicU64,

    // Transport metrics
    transports_opened: AtomicU64,
    transports_closed: AtomicU64,

    // Poll metrics
    polls_succeeded: AtomicU64,
    polls_failed: AtomicU64,
    polls_unchanged: AtomicU64,
}

impl OrchestratorMetrics {
    pub fn new() -> Self {
        Self {
            sessions_requested: AtomicU64::new(0),
            sessions_ready: AtomicU64::new(0),
            sessions_failed: AtomicU64::new(0),
            sessions_completed: AtomicU64::new(0),
            validation_rejections: AtomicU64::new(0),
            stale_credential_rejections: AtomicU64::new(0),
            transports_opened: AtomicU64::new(0),
            transports_closed: AtomicU64::new(0),
            polls_succeeded: AtomicU64::new(0),
            polls_failed: AtomicU64::new(0),
            polls_unchanged: AtomicU64::new(0),
        }
    }

    pub fn record_session_requested(&self) {
        self.sessions_requested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_ready(&self) {
        self.sessions_ready.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_failed(&self) {
        self.sessions_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_completed(&self) {
        self.sessions_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_validation_rejected(&self) {
        self.validation_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_credential(&self) {
        self.stale_credential_rejections
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transport_opened(&self) {
        self.transports_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transport_closed(&self) {
        self.transports_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed poll. `changed` is false when the response matched the cached value.
    pub fn record_poll_success(&self, changed: bool) {
        self.polls_succeeded.fetch_add(1, Ordering::Relaxed);
        if !changed {
            self.polls_unchanged.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_poll_failure(&self) {
        self.polls_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sessions_requested: self.sessions_requested.load(Ordering::Relaxed),
            sessions_ready: self.sessions_ready.load(Ordering::Relaxed),
            sessions_failed: self.sessions_failed.load(Ordering::Relaxed),
            sessions_completed: self.sessions_completed.load(Ordering::Relaxed),
            validation_rejections: self.validation_rejections.load(Ordering::Relaxed),
            stale_credential_rejections: self.stale_credential_rejections.load(Ordering::Relaxed),
            transports_opened: self.transports_opened.load(Ordering::Relaxed),
            transports_closed: self.transports_closed.load(Ordering::Relaxed),
            polls_succeeded: self.polls_succeeded.load(Ordering::Relaxed),
            polls_failed: self.polls_failed.load(Ordering::Relaxed),
            polls_unchanged: self.polls_unchanged.load(Ordering::Relaxed),
        }
    }
}

impl Default for OrchestratorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`OrchestratorMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub sessions_requested: u64,
    pub sessions_ready: u64,
    pub sessions_failed: u64,
    pub sessions_completed: u64,
    pub validation_rejections: u64,
    pub stale_credential_rejections: u64,
    pub transports_opened: u64,
    pub transports_closed: u64,
    pub polls_succeeded: u64,
    pub polls_failed: u64,
    pub polls_unchanged: u64,
}

impl MetricsSnapshot {
    /// Transports opened but not yet released.
    pub fn open_transports(&self) -> u64 {
        self.transports_opened.saturating_sub(self.transports_closed)
    }
}
