//! Shared fixtures for orchestrator integration tests.

#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Once,
};

use async_trait::async_trait;
use callops_orchestrator::{TransportClient, TransportError, TransportEventSink};
use callops_protocol::{AccessCredential, AgentConfiguration, ConfigurationId, VoiceSettings};
use parking_lot::Mutex;
use tracing_subscriber::{
    filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .with(
                EnvFilter::builder()
                    .with_default_directive(LevelFilter::INFO.into())
                    .from_env_lossy(),
            )
            .try_init();
    });
}

/// Transport double that records every command and exposes the event sink of
/// the latest connection so tests can play the transport's side.
#[derive(Default)]
pub struct RecordingTransport {
    opens: Mutex<Vec<(String, u32)>>,
    closes: AtomicUsize,
    sinks: Mutex<Vec<TransportEventSink>>,
    reject_open: Mutex<Option<String>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make the next `open` fail synchronously with `message`.
    pub fn reject_next_open(&self, message: &str) {
        *self.reject_open.lock() = Some(message.to_string());
    }

    pub fn open_count(&self) -> usize {
        self.opens.lock().len()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn opened_credentials(&self) -> Vec<String> {
        self.opens.lock().iter().map(|(c, _)| c.clone()).collect()
    }

    pub fn opened_rates(&self) -> Vec<u32> {
        self.opens.lock().iter().map(|(_, r)| *r).collect()
    }

    /// Sink handed to the most recent `open`.
    pub fn sink(&self) -> TransportEventSink {
        self.sinks
            .lock()
            .last()
            .cloned()
            .expect("transport was never opened")
    }
}

#[async_trait]
impl TransportClient for RecordingTransport {
    async fn open(
        &self,
        credential: &AccessCredential,
        sample_rate: u32,
        events: TransportEventSink,
    ) -> Result<(), TransportError> {
        self.opens
            .lock()
            .push((credential.expose().to_string(), sample_rate));
        self.sinks.lock().push(events);
        match self.reject_open.lock().take() {
            Some(message) => Err(TransportError::new(message)),
            None => Ok(()),
        }
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn configuration(id: &str, sample_rate: Option<u32>) -> AgentConfiguration {
    AgentConfiguration {
        id: ConfigurationId::new(id),
        name: format!("Config {id}"),
        system_prompt: "You are a dispatcher.".to_string(),
        initial_message: "Hi, this is dispatch.".to_string(),
        voice_settings: Some(VoiceSettings {
            voice_id: Some("11labs-Adrian".to_string()),
            sample_rate,
            extra: Default::default(),
        }),
        created_at: None,
        updated_at: None,
    }
}
