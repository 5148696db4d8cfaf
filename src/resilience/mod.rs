//! 弹性模式模块：为不可靠的网络调用提供带退避的重试。
//!
//! # Resilience Module
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`RetryEngine`] | Runs an async operation under a [`RetryPolicy`] |
//! | [`RetryPolicy`] | Attempts, backoff, jitter, timeout, retry predicate |
//! | [`with_retry`] | Convenience entry point without a network monitor |
//!
//! ## Presets
//!
//! | Preset | Attempts | Base | Cap |
//! |--------|----------|------|-----|
//! | [`RetryPolicy::default`] | 3 | 1s | 30s |
//! | [`RetryPolicy::network`] | 5 | 2s | 16s |
//! | [`RetryPolicy::provider`] | 4 | 2s | 20s |
//!
//! ```rust
//! use ai_gen_pipeline::resilience::{with_retry, RetryPolicy};
//! use std::time::Duration;
//!
//! # async fn demo() -> ai_gen_pipeline::Result<()> {
//! let policy = RetryPolicy::default().with_timeout(Duration::from_secs(5));
//! let outcome = with_retry(&policy, || async { Ok::<_, ai_gen_pipeline::Error>(42) }).await?;
//! assert_eq!(outcome.attempts, 1);
//! # Ok(())
//! # }
//! ```

pub mod retry;

pub use retry::{
    default_retry_predicate, provider_retry_predicate, with_retry, RetryEngine, RetryEvent,
    RetryObserver, RetryOutcome, RetryPolicy, RetryPredicate,
};
