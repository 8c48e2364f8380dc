use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use callops_protocol::{CallId, CallRecord, DashboardSummary};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{watch, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{
    retry::RetryPolicy,
    source::{CallListSource, CallRecordSource, DashboardSource, PollSource, PollTarget},
};
use crate::{config::SyncConfig, gateway::CallGateway, metrics::OrchestratorMetrics};

/// Load phase of a polled view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "reason", rename_all = "snake_case")]
pub enum PollPhase {
    /// Waiting for the first response.
    Loading,
    Ready,
    /// The first load failed and the view has no fallback. Polling has stopped.
    Unavailable(String),
}

/// Cached value of one poller plus its load status.
#[derive(Debug, Clone, PartialEq)]
pub struct PollSnapshot<T> {
    pub value: Option<T>,
    pub phase: PollPhase,
    /// Reason of the most recent failed poll, cleared by the next success.
    pub last_error: Option<String>,
}

impl<T> Default for PollSnapshot<T> {
    fn default() -> Self {
        Self {
            value: None,
            phase: PollPhase::Loading,
            last_error: None,
        }
    }
}

impl<T> PollSnapshot<T> {
    pub fn is_loading(&self) -> bool {
        self.phase == PollPhase::Loading
    }
}

/// Handle to one running poller. Dropping it stops the poller.
pub struct PollHandle<T> {
    target: PollTarget,
    rx: watch::Receiver<PollSnapshot<T>>,
    refresh: Arc<Notify>,
    token: CancellationToken,
}

impl<T: Clone> PollHandle<T> {
    pub fn target(&self) -> &PollTarget {
        &self.target
    }

    pub fn snapshot(&self) -> PollSnapshot<T> {
        self.rx.borrow().clone()
    }

    pub fn value(&self) -> Option<T> {
        self.rx.borrow().value.clone()
    }

    /// Receiver notified only when the snapshot actually changes.
    pub fn subscribe(&self) -> watch::Receiver<PollSnapshot<T>> {
        self.rx.clone()
    }

    /// Wait until the snapshot satisfies `predicate`. Returns `None` if the
    /// poller exited first without ever satisfying it.
    pub async fn wait_until<F>(&self, mut predicate: F) -> Option<PollSnapshot<T>>
    where
        F: FnMut(&PollSnapshot<T>) -> bool,
    {
        let mut rx = self.rx.clone();
        if let Ok(snapshot) = rx.wait_for(|snapshot| predicate(snapshot)).await {
            return Some(snapshot.clone());
        }
        let last = rx.borrow().clone();
        predicate(&last).then_some(last)
    }

    /// Skip the rest of the current wait and poll now. Has no effect on a
    /// stopped poller.
    pub fn refresh_now(&self) {
        self.refresh.notify_one();
    }

    /// Cancel future polls. A fetch already in flight completes and is discarded.
    pub fn stop_polling(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl<T> Drop for PollHandle<T> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Starts and tracks independent pollers against one gateway.
///
/// Each poller owns its interval, cache slot and cancellation. Polls of one
/// poller never overlap: the next wait starts only after the in-flight fetch
/// resolves. Failed polls are logged and retried per the [`RetryPolicy`]; they
/// never touch any call session.
pub struct Synchronizer {
    gateway: Arc<dyn CallGateway>,
    interval: Duration,
    retry: RetryPolicy,
    metrics: Arc<OrchestratorMetrics>,
    shutdown_token: CancellationToken,
    pollers: Arc<DashMap<u64, PollTarget>>,
    next_poller: AtomicU64,
}

impl Synchronizer {
    pub fn new(gateway: Arc<dyn CallGateway>, config: &SyncConfig) -> Self {
        Self::with_metrics(gateway, config, Arc::new(OrchestratorMetrics::new()))
    }

    pub fn with_metrics(
        gateway: Arc<dyn CallGateway>,
        config: &SyncConfig,
        metrics: Arc<OrchestratorMetrics>,
    ) -> Self {
        Self {
            gateway,
            interval: config.poll_interval(),
            retry: config.retry.policy(),
            metrics,
            shutdown_token: CancellationToken::new(),
            pollers: Arc::new(DashMap::new()),
            next_poller: AtomicU64::new(0),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll the call list on the configured interval.
    pub fn watch_calls(&self) -> PollHandle<Vec<CallRecord>> {
        self.start_polling(CallListSource)
    }

    /// Poll a single call record on the configured interval.
    pub fn watch_call(&self, id: impl Into<CallId>) -> PollHandle<CallRecord> {
        self.start_polling(CallRecordSource::new(id))
    }

    /// Poll the dashboard summary on the configured interval.
    pub fn watch_dashboard(&self) -> PollHandle<DashboardSummary> {
        self.start_polling(DashboardSource)
    }

    pub fn start_polling<S: PollSource>(&self, source: S) -> PollHandle<S::Output> {
        self.start_polling_every(source, self.interval)
    }

    /// Start a poller for `source`. The first fetch happens immediately.
    pub fn start_polling_every<S: PollSource>(
        &self,
        source: S,
        interval: Duration,
    ) -> PollHandle<S::Output> {
        let id = self.next_poller.fetch_add(1, Ordering::Relaxed);
        let target = source.target();
        let (tx, rx) = watch::channel(PollSnapshot::default());
        let refresh = Arc::new(Notify::new());
        let token = self.shutdown_token.child_token();

        self.pollers.insert(id, target.clone());
        info!(%target, interval_ms = interval.as_millis() as u64, "Starting poller");

        let poller = Poller {
            source,
            gateway: Arc::clone(&self.gateway),
            interval,
            retry: self.retry,
            metrics: Arc::clone(&self.metrics),
            state: tx,
            refresh: Arc::clone(&refresh),
            token: token.clone(),
        };
        let pollers = Arc::clone(&self.pollers);
        tokio::spawn(async move {
            poller.run().await;
            pollers.remove(&id);
        });

        PollHandle {
            target,
            rx,
            refresh,
            token,
        }
    }

    /// Targets with a running poller.
    pub fn active_targets(&self) -> Vec<PollTarget> {
        let mut entries: Vec<(u64, PollTarget)> = self
            .pollers
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries.into_iter().map(|(_, target)| target).collect()
    }

    pub fn metrics(&self) -> &Arc<OrchestratorMetrics> {
        &self.metrics
    }

    /// Stop every poller started from this synchronizer.
    pub fn shutdown(&self) {
        self.shutdown_token.cancel();
    }
}

impl Drop for Synchronizer {
    fn drop(&mut self) {
        self.shutdown_token.cancel();
    }
}

struct Poller<S: PollSource> {
    source: S,
    gateway: Arc<dyn CallGateway>,
    interval: Duration,
    retry: RetryPolicy,
    metrics: Arc<OrchestratorMetrics>,
    state: watch::Sender<PollSnapshot<S::Output>>,
    refresh: Arc<Notify>,
    token: CancellationToken,
}

impl<S: PollSource> Poller<S> {
    async fn run(self) {
        let target = self.source.target();
        let mut loaded = false;
        let mut failures: u32 = 0;

        loop {
            // In-flight fetches are not cancelled; a stopped poller discards the result.
            let result = self.source.fetch(self.gateway.as_ref()).await;
            if self.token.is_cancelled() {
                debug!(%target, "Discarding poll result for stopped poller");
                break;
            }

            match result {
                Ok(fresh) => {
                    failures = 0;
                    loaded = true;
                    let changed = self.apply(fresh);
                    self.metrics.record_poll_success(changed);
                    if changed {
                        debug!(%target, "Poll updated cache");
                    }
                }
                Err(err) => {
                    failures = failures.saturating_add(1);
                    self.metrics.record_poll_failure();
                    let reason = err.to_string();

                    if loaded {
                        warn!(%target, error = %reason, failures, "Poll failed, will retry");
                        self.state.send_if_modified(|snapshot| {
                            if snapshot.last_error.as_deref() == Some(reason.as_str()) {
                                return false;
                            }
                            snapshot.last_error = Some(reason);
                            true
                        });
                    } else if let Some(fallback) = self.source.initial_failure_fallback() {
                        warn!(%target, error = %reason, "Initial load failed, showing empty view");
                        loaded = true;
                        self.state.send_modify(|snapshot| {
                            snapshot.value = Some(fallback);
                            snapshot.phase = PollPhase::Ready;
                            snapshot.last_error = Some(reason);
                        });
                    } else {
                        warn!(%target, error = %reason, "Initial load failed, stopping poller");
                        self.state.send_modify(|snapshot| {
                            snapshot.phase = PollPhase::Unavailable(reason.clone());
                            snapshot.last_error = Some(reason);
                        });
                        break;
                    }
                }
            }

            let delay = self.retry.next_delay(self.interval, failures);
            tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                _ = self.refresh.notified() => debug!(%target, "Refresh requested"),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.token.cancel();
        debug!(%target, "Poller stopped");
    }

    /// Fold `fresh` into the cache. Returns whether observers were notified.
    fn apply(&self, fresh: S::Output) -> bool {
        let source = &self.source;
        self.state.send_if_modified(|snapshot| {
            let next = source.reconcile(snapshot.value.as_ref(), fresh);
            let mut modified = false;
            if snapshot.value.as_ref() != Some(&next) {
                snapshot.value = Some(next);
                modified = true;
            }
            if snapshot.phase != PollPhase::Ready {
                snapshot.phase = PollPhase::Ready;
                modified = true;
            }
            if snapshot.last_error.take().is_some() {
                modified = true;
            }
            modified
        })
    }
}
