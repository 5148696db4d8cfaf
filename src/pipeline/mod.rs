//! 流水线编排模块：将网络监视器、生成门面与离线队列连接成一条处理路径。
//!
//! # Content Pipeline
//!
//! ```text
//! submit ─► sanitize ─► online? ──yes──► GenerationService ─► history
//!                          │                   │ (network failure, now offline)
//!                          no ◄────────────────┘
//!                          ▼
//!                    OfflineQueue ◄── drain on reconnect ── NetworkMonitor
//! ```
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`ContentPipeline`] | Entry point for interactive requests |
//! | [`Submission`] | Completed artifact or id of the queued task |

mod content;

pub use content::{ContentPipeline, Submission};
