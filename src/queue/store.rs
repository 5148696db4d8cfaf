//! Persistence repositories for the queue and the artifact history.

use super::task::QueuedTask;
use crate::generation::GenerationArtifact;
use crate::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// Ordered, persisted list of deferred tasks.
///
/// `save_queue` replaces the whole list and must be atomic: a crash mid-write
/// leaves either the previous or the new list, never a torn one.
#[async_trait]
pub trait QueueStore: Send + Sync {
    async fn load_queue(&self) -> Result<Vec<QueuedTask>>;
    async fn save_queue(&self, tasks: &[QueuedTask]) -> Result<()>;
}

/// Append-only history of completed generations.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn append_artifact(&self, artifact: &GenerationArtifact) -> Result<()>;
    async fn list_artifacts(&self) -> Result<Vec<GenerationArtifact>>;
}

/// Process-local store, used by tests and short-lived embeddings.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    queue: RwLock<Vec<QueuedTask>>,
    artifacts: RwLock<Vec<GenerationArtifact>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueueStore for InMemoryStore {
    async fn load_queue(&self) -> Result<Vec<QueuedTask>> {
        Ok(self.queue.read().unwrap_or_else(|e| e.into_inner()).clone())
    }

    async fn save_queue(&self, tasks: &[QueuedTask]) -> Result<()> {
        *self.queue.write().unwrap_or_else(|e| e.into_inner()) = tasks.to_vec();
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for InMemoryStore {
    async fn append_artifact(&self, artifact: &GenerationArtifact) -> Result<()> {
        self.artifacts
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(artifact.clone());
        Ok(())
    }

    async fn list_artifacts(&self) -> Result<Vec<GenerationArtifact>> {
        Ok(self.artifacts.read().unwrap_or_else(|e| e.into_inner()).clone())
    }
}

/// File-backed store: the queue is one JSON document, history is JSON lines.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    queue_path: PathBuf,
    history_path: PathBuf,
}

impl JsonFileStore {
    pub fn new(queue_path: impl Into<PathBuf>, history_path: impl Into<PathBuf>) -> Self {
        Self {
            queue_path: queue_path.into(),
            history_path: history_path.into(),
        }
    }

    /// `queue.json` and `history.jsonl` under `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join("queue.json"), dir.join("history.jsonl"))
    }

    pub fn queue_path(&self) -> &Path {
        &self.queue_path
    }

    pub fn history_path(&self) -> &Path {
        &self.history_path
    }
}

async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

/// Write `bytes` beside `path` and rename over it.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    ensure_parent(path).await?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

async fn read_optional(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl QueueStore for JsonFileStore {
    async fn load_queue(&self) -> Result<Vec<QueuedTask>> {
        match read_optional(&self.queue_path).await? {
            Some(text) if !text.trim().is_empty() => serde_json::from_str(&text).map_err(|e| {
                Error::storage(format!(
                    "queue file {} is corrupt: {}",
                    self.queue_path.display(),
                    e
                ))
            }),
            _ => Ok(Vec::new()),
        }
    }

    async fn save_queue(&self, tasks: &[QueuedTask]) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(tasks)?;
        write_atomic(&self.queue_path, &bytes).await
    }
}

#[async_trait]
impl ArtifactStore for JsonFileStore {
    async fn append_artifact(&self, artifact: &GenerationArtifact) -> Result<()> {
        ensure_parent(&self.history_path).await?;
        let mut line = serde_json::to_vec(artifact)?;
        line.push(b'\n');
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.history_path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    async fn list_artifacts(&self) -> Result<Vec<GenerationArtifact>> {
        let Some(text) = read_optional(&self.history_path).await? else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        for (index, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(artifact) => out.push(artifact),
                // A torn trailing line from an interrupted append is skipped.
                Err(e) => warn!(line = index + 1, error = %e, "skipping unreadable history line"),
            }
        }
        Ok(out)
    }
}
