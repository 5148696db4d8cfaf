//! The opaque remote capability the façade drives.

use super::types::{GenerationRequest, ResearchResult};
use crate::Result;
use async_trait::async_trait;

/// A generation provider: structured prompt in, raw text out, or an error.
///
/// Implementations should return [`crate::Error::Network`] (via
/// [`crate::Error::network`]) for transport and HTTP-status failures so the retry
/// engine can act on the `retryable` tag. Parsing of the returned text is the
/// façade's job.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Research `topic`; returns the raw provider response.
    async fn research(&self, topic: &str) -> Result<String>;

    /// Generate an article; returns the raw provider response.
    async fn generate(
        &self,
        request: &GenerationRequest,
        research: Option<&ResearchResult>,
    ) -> Result<String>;

    fn name(&self) -> &'static str {
        "backend"
    }
}
