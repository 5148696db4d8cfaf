use crate::config::PipelineConfig;
use crate::generation::{GenerationArtifact, GenerationBackend, GenerationRequest, GenerationService};
use crate::logging::{LogLevel, Logger};
use crate::network::NetworkMonitor;
use crate::queue::{
    ArtifactStore, DrainReport, JsonFileStore, NewTask, OfflineQueue, QueueStore,
};
use crate::resilience::{RetryEngine, RetryPolicy};
use crate::Result;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Outcome of [`ContentPipeline::submit`].
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Completed(Box<GenerationArtifact>),
    /// Deferred until connectivity returns; carries the queued task id.
    Queued(String),
}

impl Submission {
    pub fn artifact(&self) -> Option<&GenerationArtifact> {
        match self {
            Submission::Completed(artifact) => Some(&**artifact),
            Submission::Queued(_) => None,
        }
    }

    pub fn is_queued(&self) -> bool {
        matches!(self, Submission::Queued(_))
    }
}

/// Wires the network monitor, generation façade and offline queue together.
pub struct ContentPipeline {
    service: GenerationService,
    queue: Arc<OfflineQueue>,
    history: Arc<dyn ArtifactStore>,
    monitor: Arc<NetworkMonitor>,
    logger: Logger,
}

impl ContentPipeline {
    /// Build a pipeline around an existing service. The service's retry engine
    /// should share `monitor` so attempts fail fast when offline.
    pub fn new(
        service: GenerationService,
        monitor: Arc<NetworkMonitor>,
        queue_store: Arc<dyn QueueStore>,
        history: Arc<dyn ArtifactStore>,
    ) -> Self {
        let queue = OfflineQueue::new(
            queue_store,
            Arc::clone(&history),
            Arc::new(service.clone()),
            Arc::clone(&monitor),
        );
        Self::with_queue(service, monitor, Arc::new(queue), history)
    }

    pub fn with_queue(
        service: GenerationService,
        monitor: Arc<NetworkMonitor>,
        queue: Arc<OfflineQueue>,
        history: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            service,
            queue,
            history,
            monitor,
            logger: Logger::new("pipeline"),
        }
    }

    /// Build everything from configuration with file-backed persistence.
    pub fn from_config(
        config: &PipelineConfig,
        backend: Arc<dyn GenerationBackend>,
        monitor: Arc<NetworkMonitor>,
    ) -> Self {
        let service = GenerationService::builder(backend)
            .retry_engine(RetryEngine::new().with_monitor(Arc::clone(&monitor)))
            .retry_policy(RetryPolicy::provider())
            .cache_ttl(config.cache_ttl())
            .response_memo_capacity(config.response_memo_capacity)
            .max_prompt_length(config.max_prompt_length)
            .build();
        let store = Arc::new(JsonFileStore::new(&config.queue_path, &config.history_path));
        let queue = OfflineQueue::new(
            store.clone(),
            store.clone(),
            Arc::new(service.clone()),
            Arc::clone(&monitor),
        )
        .with_max_attempts(config.max_task_attempts);
        Self::with_queue(service, monitor, Arc::new(queue), store)
    }

    /// Run `request` now if online, otherwise queue it.
    ///
    /// Validation failures are returned immediately and never queued. A network
    /// failure that leaves the device offline queues the request instead of
    /// surfacing; any other failure is returned.
    pub async fn submit(&self, request: GenerationRequest) -> Result<Submission> {
        let prepared = self.service.prepare(&request)?;

        if !self.monitor.is_online() {
            return self.defer(prepared).await;
        }

        match self.service.generate(&prepared).await {
            Ok(artifact) => {
                self.history.append_artifact(&artifact).await?;
                Ok(Submission::Completed(Box::new(artifact)))
            }
            Err(err) if err.is_network_error() && !self.monitor.is_online() => {
                self.logger
                    .failure(LogLevel::Info, "went offline during generation; queueing", &err);
                self.defer(prepared).await
            }
            Err(err) => {
                self.logger.failure(LogLevel::Error, "generation failed", &err);
                Err(err)
            }
        }
    }

    async fn defer(&self, request: GenerationRequest) -> Result<Submission> {
        let task = self.queue.enqueue(NewTask::from(request)).await?;
        info!(task_id = %task.id, "offline: request deferred");
        Ok(Submission::Queued(task.id))
    }

    /// Spawn the reconnect-triggered drain loop.
    pub fn start(&self) -> JoinHandle<()> {
        self.queue.spawn_auto_drain()
    }

    pub async fn drain(&self) -> Result<DrainReport> {
        self.queue.drain().await
    }

    pub async fn history(&self) -> Result<Vec<GenerationArtifact>> {
        self.history.list_artifacts().await
    }

    pub fn queue(&self) -> &Arc<OfflineQueue> {
        &self.queue
    }

    pub fn service(&self) -> &GenerationService {
        &self.service
    }

    pub fn monitor(&self) -> &Arc<NetworkMonitor> {
        &self.monitor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::ResearchResult;
    use crate::network::{NetworkState, TransportType};
    use crate::queue::InMemoryStore;
    use crate::Error;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoBackend {
        calls: AtomicUsize,
        fail_with: Option<Error>,
    }

    #[async_trait]
    impl GenerationBackend for EchoBackend {
        async fn research(&self, topic: &str) -> Result<String> {
            Ok(format!(r#"{{"summary": "About {}."}}"#, topic))
        }

        async fn generate(
            &self,
            request: &GenerationRequest,
            _research: Option<&ResearchResult>,
        ) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = &self.fail_with {
                return Err(err.clone());
            }
            Ok(format!(
                r#"{{"title": "On {}", "content": "Some words here."}}"#,
                request.topic
            ))
        }
    }

    fn pipeline(
        online: bool,
        fail_with: Option<Error>,
    ) -> (ContentPipeline, Arc<EchoBackend>, Arc<NetworkMonitor>) {
        let backend = Arc::new(EchoBackend {
            calls: AtomicUsize::new(0),
            fail_with,
        });
        let monitor = NetworkMonitor::with_state(if online {
            NetworkState::online(TransportType::Wifi)
        } else {
            NetworkState::offline()
        });
        let service = GenerationService::builder(backend.clone())
            .retry_engine(RetryEngine::new().with_monitor(monitor.clone()))
            .retry_policy(RetryPolicy::provider().with_max_attempts(1))
            .build();
        let store = Arc::new(InMemoryStore::new());
        let pipeline = ContentPipeline::new(service, monitor.clone(), store.clone(), store);
        (pipeline, backend, monitor)
    }

    #[tokio::test]
    async fn test_online_submit_completes_and_records_history() {
        let (pipeline, backend, _) = pipeline(true, None);
        let submission = pipeline
            .submit(GenerationRequest::new("remote work tips"))
            .await
            .unwrap();
        assert_eq!(
            submission.artifact().map(|a| a.article.title.as_str()),
            Some("On remote work tips")
        );
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(pipeline.history().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_offline_submit_queues_without_calling_backend() {
        let (pipeline, backend, _) = pipeline(false, None);
        let submission = pipeline
            .submit(GenerationRequest::new("remote work tips"))
            .await
            .unwrap();
        assert!(submission.is_queued());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);

        let tasks = pipeline.queue().list().await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].topic, "remote work tips");
        assert_eq!(tasks[0].attempts, 0);
        assert!(!tasks[0].with_research);
    }

    #[tokio::test]
    async fn test_invalid_input_is_never_queued() {
        let (pipeline, _, _) = pipeline(false, None);
        let err = pipeline.submit(GenerationRequest::new("  <>  ")).await.unwrap_err();
        assert!(err.is_validation_error());
        assert!(pipeline.queue().is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_online_failure_is_surfaced() {
        let (pipeline, _, _) = pipeline(true, Some(Error::network("denied", None, Some(401))));
        let err = pipeline.submit(GenerationRequest::new("x")).await.unwrap_err();
        assert!(matches!(err, Error::Network { status_code: Some(401), .. }));
        assert!(pipeline.queue().is_empty().await.unwrap());
    }
}
