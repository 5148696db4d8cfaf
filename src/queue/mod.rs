//! 离线任务队列模块：离线时持久化生成请求，恢复连接后按 FIFO 顺序重放。
//!
//! # Offline Task Queue
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`OfflineQueue`] | Enqueue, remove, and strictly sequential drain |
//! | [`QueuedTask`] / [`NewTask`] | Persisted task and its pre-id form |
//! | [`QueueStore`] / [`ArtifactStore`] | Persistence repositories |
//! | [`InMemoryStore`] / [`JsonFileStore`] | Store implementations |
//! | [`TaskExecutor`] | Runs a reconstructed request (the generation façade) |
//!
//! A task that fails [`MAX_TASK_ATTEMPTS`] drain attempts is dropped so it cannot
//! block the tasks behind it.

mod offline;
mod store;
mod task;

pub use offline::{DrainReport, OfflineQueue, TaskExecutor};
pub use store::{ArtifactStore, InMemoryStore, JsonFileStore, QueueStore};
pub use task::{NewTask, QueuedTask, MAX_TASK_ATTEMPTS};
