//! Shared fixtures for integration tests.
#![allow(dead_code)]

use ai_gen_pipeline::generation::{GenerationBackend, GenerationRequest, ResearchResult};
use ai_gen_pipeline::network::{NetworkMonitor, NetworkState, TransportType};
use ai_gen_pipeline::resilience::{RetryEngine, RetryPolicy};
use ai_gen_pipeline::{Error, GenerationService, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Backend returning a fixed article body, optionally gated so tests can hold
/// a call open.
pub struct StubBackend {
    pub body: Mutex<String>,
    pub generate_calls: AtomicUsize,
    pub research_calls: AtomicUsize,
    pub gate: Option<Arc<Notify>>,
    pub failures_left: AtomicUsize,
}

impl StubBackend {
    pub fn returning(body: &str) -> Arc<Self> {
        Arc::new(Self {
            body: Mutex::new(body.to_string()),
            generate_calls: AtomicUsize::new(0),
            research_calls: AtomicUsize::new(0),
            gate: None,
            failures_left: AtomicUsize::new(0),
        })
    }

    pub fn gated(body: &str, gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            body: Mutex::new(body.to_string()),
            generate_calls: AtomicUsize::new(0),
            research_calls: AtomicUsize::new(0),
            gate: Some(gate),
            failures_left: AtomicUsize::new(0),
        })
    }

    pub fn failing_first(body: &str, failures: usize) -> Arc<Self> {
        let backend = Self::returning(body);
        backend.failures_left.store(failures, Ordering::SeqCst);
        backend
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationBackend for StubBackend {
    async fn research(&self, topic: &str) -> Result<String> {
        self.research_calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!(r#"{{"summary": "Background on {}."}}"#, topic))
    }

    async fn generate(
        &self,
        _request: &GenerationRequest,
        _research: Option<&ResearchResult>,
    ) -> Result<String> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(Error::network("service unavailable", None, Some(503)));
        }
        Ok(self.body.lock().unwrap().clone())
    }
}

pub fn monitor(online: bool) -> Arc<NetworkMonitor> {
    NetworkMonitor::with_state(if online {
        NetworkState::online(TransportType::Wifi)
    } else {
        NetworkState::offline()
    })
}

pub fn fast_policy() -> RetryPolicy {
    RetryPolicy::provider()
        .with_base_delay(Duration::from_millis(1))
        .with_max_delay(Duration::from_millis(4))
        .with_jitter(false)
}

pub fn service(backend: Arc<StubBackend>, monitor: &Arc<NetworkMonitor>) -> GenerationService {
    GenerationService::builder(backend)
        .retry_engine(RetryEngine::new().with_monitor(Arc::clone(monitor)))
        .retry_policy(fast_policy())
        .build()
}

pub const VALID_ARTICLE: &str = r#"{
    "title": "Remote Work Tips",
    "content": "Keep a routine. Take breaks. Over-communicate with your team.",
    "faq": [{"question": "How do I focus?", "answer": "Block time."}]
}"#;
