//! Durable FIFO queue of deferred generation requests, drained on reconnect.

use super::store::{ArtifactStore, QueueStore};
use super::task::{NewTask, QueuedTask, MAX_TASK_ATTEMPTS};
use crate::generation::{GenerationArtifact, GenerationRequest};
use crate::logging::{LogLevel, Logger};
use crate::network::NetworkMonitor;
use crate::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Runs one reconstructed request through the same path interactive calls use.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, request: &GenerationRequest) -> Result<GenerationArtifact>;
}

/// What one `drain()` invocation did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    /// Ids of tasks that succeeded and were appended to history.
    pub completed: Vec<String>,
    /// Ids of tasks removed after reaching the attempt ceiling.
    pub dropped: Vec<String>,
    /// Head task whose non-terminal failure stopped this drain.
    pub halted_on: Option<String>,
    pub remaining: usize,
}

impl DrainReport {
    pub fn is_noop(&self) -> bool {
        self.completed.is_empty() && self.dropped.is_empty() && self.halted_on.is_none()
    }
}

/// Durable FIFO of generation requests deferred while offline.
///
/// Every mutation is a load → modify → save against the [`QueueStore`] under one
/// lock, so the persisted list is always a complete snapshot. Drains are
/// serialized: a second `drain()` waits for the first and then sees its result.
pub struct OfflineQueue {
    store: Arc<dyn QueueStore>,
    history: Arc<dyn ArtifactStore>,
    executor: Arc<dyn TaskExecutor>,
    monitor: Arc<NetworkMonitor>,
    max_attempts: u32,
    mutation: Mutex<()>,
    draining: Mutex<()>,
    logger: Logger,
}

impl OfflineQueue {
    pub fn new(
        store: Arc<dyn QueueStore>,
        history: Arc<dyn ArtifactStore>,
        executor: Arc<dyn TaskExecutor>,
        monitor: Arc<NetworkMonitor>,
    ) -> Self {
        Self {
            store,
            history,
            executor,
            monitor,
            max_attempts: MAX_TASK_ATTEMPTS,
            mutation: Mutex::new(()),
            draining: Mutex::new(()),
            logger: Logger::new("offline_queue"),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Append a task with a fresh id and zero attempts. There is no capacity bound.
    pub async fn enqueue(&self, task: NewTask) -> Result<QueuedTask> {
        let task = task.into_task();
        let _guard = self.mutation.lock().await;
        let mut tasks = self.store.load_queue().await?;
        tasks.push(task.clone());
        self.store.save_queue(&tasks).await?;
        info!(task_id = %task.id, queued = tasks.len(), "task queued");
        Ok(task)
    }

    /// Remove a task by id. Returns false if it was not queued.
    pub async fn remove(&self, id: &str) -> Result<bool> {
        let _guard = self.mutation.lock().await;
        let mut tasks = self.store.load_queue().await?;
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        if tasks.len() == before {
            return Ok(false);
        }
        self.store.save_queue(&tasks).await?;
        Ok(true)
    }

    pub async fn list(&self) -> Result<Vec<QueuedTask>> {
        self.store.load_queue().await
    }

    pub async fn len(&self) -> Result<usize> {
        Ok(self.store.load_queue().await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    pub async fn clear(&self) -> Result<()> {
        let _guard = self.mutation.lock().await;
        self.store.save_queue(&[]).await
    }

    async fn head(&self) -> Result<Option<QueuedTask>> {
        let _guard = self.mutation.lock().await;
        Ok(self.store.load_queue().await?.into_iter().next())
    }

    async fn record_failure(&self, id: &str, attempts: u32) -> Result<()> {
        let _guard = self.mutation.lock().await;
        let mut tasks = self.store.load_queue().await?;
        if let Some(task) = tasks.iter_mut().find(|t| t.id == id) {
            task.attempts = attempts;
            self.store.save_queue(&tasks).await?;
        }
        Ok(())
    }

    /// Process tasks from the head, one at a time, while online.
    ///
    /// Success appends the artifact to history and removes the task. A failure
    /// increments `attempts`; at the ceiling the task is dropped and draining
    /// continues, below it draining stops with the task left at the head.
    pub async fn drain(&self) -> Result<DrainReport> {
        let _draining = self.draining.lock().await;
        let mut report = DrainReport::default();

        loop {
            if !self.monitor.is_online() {
                debug!("drain paused: offline");
                break;
            }
            let Some(task) = self.head().await? else {
                break;
            };

            match self.executor.execute(&task.to_request()).await {
                Ok(artifact) => {
                    self.history.append_artifact(&artifact).await?;
                    self.remove(&task.id).await?;
                    info!(task_id = %task.id, artifact_id = %artifact.id, "queued task completed");
                    report.completed.push(task.id);
                }
                Err(err) => {
                    let attempts = task.attempts + 1;
                    if attempts >= self.max_attempts {
                        self.remove(&task.id).await?;
                        self.logger.warn(
                            "dropping queued task after repeated failures",
                            Some(&json!({
                                "task_id": task.id,
                                "attempts": attempts,
                                "error": crate::logging::error_value(&err),
                            })),
                        );
                        report.dropped.push(task.id);
                        continue;
                    }
                    self.record_failure(&task.id, attempts).await?;
                    self.logger
                        .failure(LogLevel::Info, "queued task failed; drain halted", &err);
                    report.halted_on = Some(task.id);
                    break;
                }
            }
        }

        report.remaining = self.len().await?;
        Ok(report)
    }

    /// Drain on every offline → online transition reported by `monitor`.
    ///
    /// The task holds only a weak reference and exits once the queue is dropped.
    pub fn spawn_auto_drain(self: &Arc<Self>) -> JoinHandle<()> {
        let mut online = self.monitor.watch_online();
        let queue = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut was_online = *online.borrow_and_update();
            while online.changed().await.is_ok() {
                let now_online = *online.borrow_and_update();
                if now_online && !was_online {
                    let Some(queue) = queue.upgrade() else {
                        break;
                    };
                    match queue.drain().await {
                        Ok(report) => info!(
                            completed = report.completed.len(),
                            dropped = report.dropped.len(),
                            remaining = report.remaining,
                            "auto-drain finished"
                        ),
                        Err(e) => queue.logger.failure(LogLevel::Error, "auto-drain failed", &e),
                    }
                }
                was_online = now_online;
            }
        })
    }
}
