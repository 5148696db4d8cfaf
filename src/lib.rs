//! # ai-gen-pipeline
//!
//! 面向不可靠网络的内容生成流水线：请求去重缓存、带退避的重试以及持久化离线任务队列。
//!
//! Offline-resilient content generation pipeline. Expensive generation calls go
//! through a request cache that coalesces identical in-flight requests, a retry
//! engine with exponential backoff and jitter, and a parse step that degrades to a
//! synthesized fallback instead of failing. Requests made while offline are
//! persisted and replayed in order once connectivity returns.
//!
//! ## Flow
//!
//! ```text
//! caller ─► ContentPipeline ─► GenerationService ─► RequestCache ─► RetryEngine ─► backend
//!                 │                                                       │
//!            offline?                                         parse / validate / fallback
//!                 ▼
//!           OfflineQueue ◄── NetworkMonitor (offline → online) ── drain()
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ai_gen_pipeline::config::PipelineConfig;
//! use ai_gen_pipeline::network::{NetworkMonitor, NetworkState, TransportType};
//! use ai_gen_pipeline::pipeline::{ContentPipeline, Submission};
//! use ai_gen_pipeline::transport::HttpGenerationBackend;
//! use ai_gen_pipeline::generation::GenerationRequest;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> ai_gen_pipeline::Result<()> {
//!     let config = PipelineConfig::load()?;
//!     let backend = Arc::new(HttpGenerationBackend::from_config(&config)?);
//!     let monitor = NetworkMonitor::with_state(NetworkState::online(TransportType::Wifi));
//!     let pipeline = ContentPipeline::from_config(&config, backend, monitor);
//!     let _auto_drain = pipeline.start();
//!
//!     match pipeline.submit(GenerationRequest::new("remote work tips")).await? {
//!         Submission::Completed(artifact) => println!("{}", artifact.article.title),
//!         Submission::Queued(id) => println!("queued as {}", id),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | Request cache with coalescing, bounded LRU cache, cache keys |
//! | [`resilience`] | Retry engine and policies |
//! | [`queue`] | Offline task queue and persistence repositories |
//! | [`network`] | Connectivity state monitor |
//! | [`generation`] | Generation façade, response parsing and fallbacks |
//! | [`pipeline`] | Orchestrator wiring the pieces together |
//! | [`guardrails`] | Input sanitization and length checks |
//! | [`logging`] | Level-filtered, redacting logger |
//! | [`transport`] | HTTP generation backend |
//! | [`config`] | Layered configuration |

pub mod cache;
pub mod clock;
pub mod config;
pub mod generation;
pub mod guardrails;
pub mod logging;
pub mod network;
pub mod pipeline;
pub mod queue;
pub mod resilience;
pub mod transport;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

pub use config::PipelineConfig;
pub use generation::{Article, GenerationArtifact, GenerationRequest, GenerationService};
pub use network::{NetworkMonitor, NetworkState};
pub use pipeline::{ContentPipeline, Submission};
pub use queue::{OfflineQueue, QueuedTask};
