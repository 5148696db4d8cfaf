//! The two user-facing operations: research a topic and generate an article.

use super::backend::GenerationBackend;
use super::parse::{fallback_article, fallback_research, parse_article, parse_research};
use super::types::{Article, GenerationArtifact, GenerationRequest, ResearchResult};
use crate::cache::{BoundedCache, CacheKey, RequestCache, DEFAULT_REQUEST_TTL};
use crate::clock::{system_clock, Clock};
use crate::guardrails::{prepare_topic, DEFAULT_MAX_PROMPT_LENGTH};
use crate::logging::{LogLevel, Logger};
use crate::queue::TaskExecutor;
use crate::resilience::{RetryEngine, RetryPolicy};
use crate::Result;
use async_trait::async_trait;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_RESPONSE_MEMO_CAPACITY: usize = 64;

struct ServiceInner {
    backend: Arc<dyn GenerationBackend>,
    engine: RetryEngine,
    policy: RetryPolicy,
    research_cache: RequestCache<ResearchResult>,
    article_cache: RequestCache<Article>,
    // Successfully parsed articles keyed by a digest of the raw provider text.
    parsed_responses: BoundedCache<String, Article>,
    clock: Arc<dyn Clock>,
    max_prompt_length: usize,
    logger: Logger,
}

/// Generation façade. Requests are sanitized, coalesced/cached per normalized
/// request, retried under the provider policy, and parsed; unparseable responses
/// degrade to a synthesized fallback rather than failing.
#[derive(Clone)]
pub struct GenerationService {
    inner: Arc<ServiceInner>,
}

pub struct GenerationServiceBuilder {
    backend: Arc<dyn GenerationBackend>,
    engine: RetryEngine,
    policy: RetryPolicy,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    memo_capacity: usize,
    max_prompt_length: usize,
}

impl GenerationServiceBuilder {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            backend,
            engine: RetryEngine::new(),
            policy: RetryPolicy::provider(),
            ttl: DEFAULT_REQUEST_TTL,
            clock: system_clock(),
            memo_capacity: DEFAULT_RESPONSE_MEMO_CAPACITY,
            max_prompt_length: DEFAULT_MAX_PROMPT_LENGTH,
        }
    }

    pub fn retry_engine(mut self, engine: RetryEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn response_memo_capacity(mut self, capacity: usize) -> Self {
        self.memo_capacity = capacity;
        self
    }

    pub fn max_prompt_length(mut self, max: usize) -> Self {
        self.max_prompt_length = max;
        self
    }

    pub fn build(self) -> GenerationService {
        GenerationService {
            inner: Arc::new(ServiceInner {
                backend: self.backend,
                engine: self.engine,
                policy: self.policy,
                research_cache: RequestCache::with_clock(self.ttl, Arc::clone(&self.clock)),
                article_cache: RequestCache::with_clock(self.ttl, Arc::clone(&self.clock)),
                parsed_responses: BoundedCache::new(self.memo_capacity),
                clock: self.clock,
                max_prompt_length: self.max_prompt_length,
                logger: Logger::new("generation"),
            }),
        }
    }
}

fn digest(raw: &str) -> String {
    Sha256::digest(raw.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

impl GenerationService {
    pub fn builder(backend: Arc<dyn GenerationBackend>) -> GenerationServiceBuilder {
        GenerationServiceBuilder::new(backend)
    }

    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self::builder(backend).build()
    }

    /// Sanitize and length-check a request. Validation errors are never retried or queued.
    pub fn prepare(&self, request: &GenerationRequest) -> Result<GenerationRequest> {
        let topic = prepare_topic(&request.topic, self.inner.max_prompt_length)?;
        Ok(GenerationRequest {
            topic,
            ..request.clone()
        })
    }

    /// Research `topic`.
    pub async fn research_topic(&self, topic: &str) -> Result<ResearchResult> {
        let topic = prepare_topic(topic, self.inner.max_prompt_length)?;
        self.research_prepared(topic).await
    }

    async fn research_prepared(&self, topic: String) -> Result<ResearchResult> {
        let key = CacheKey::for_research(&topic);
        let inner = Arc::clone(&self.inner);
        self.inner
            .research_cache
            .get_or_compute(key, move || async move {
                let backend = Arc::clone(&inner.backend);
                let t = topic.clone();
                let outcome = inner
                    .engine
                    .execute(&inner.policy, move || {
                        let backend = Arc::clone(&backend);
                        let t = t.clone();
                        async move { backend.research(&t).await }
                    })
                    .await?;
                Ok(match parse_research(&outcome.data, &topic) {
                    Ok(research) => research,
                    Err(e) => {
                        inner.logger.warn(
                            "research response unparseable; using fallback",
                            Some(&json!({ "topic": topic, "error": e.to_string() })),
                        );
                        fallback_research(&outcome.data, &topic)
                    }
                })
            })
            .await
    }

    /// Generate an article for `request`, researching first when `with_research` is set.
    pub async fn generate_article(&self, request: &GenerationRequest) -> Result<Article> {
        let prepared = self.prepare(request)?;
        self.article_prepared(prepared).await.map(|(article, _)| article)
    }

    async fn article_prepared(
        &self,
        request: GenerationRequest,
    ) -> Result<(Article, Option<ResearchResult>)> {
        let research = if request.with_research {
            Some(self.research_prepared(request.topic.clone()).await?)
        } else {
            None
        };

        let key = CacheKey::for_request(&request);
        let inner = Arc::clone(&self.inner);
        let research_for_call = research.clone();
        let article = self
            .inner
            .article_cache
            .get_or_compute(key, move || async move {
                let backend = Arc::clone(&inner.backend);
                let req = request.clone();
                let res = research_for_call.clone();
                let outcome = inner
                    .engine
                    .execute(&inner.policy, move || {
                        let backend = Arc::clone(&backend);
                        let req = req.clone();
                        let res = res.clone();
                        async move { backend.generate(&req, res.as_ref()).await }
                    })
                    .await?;
                info!(
                    attempts = outcome.attempts,
                    elapsed_ms = outcome.total_time.as_millis() as u64,
                    "article generated"
                );
                Ok(Self::parse_or_fallback(&inner, &outcome.data, &request.topic))
            })
            .await?;
        Ok((article, research))
    }

    fn parse_or_fallback(inner: &ServiceInner, raw: &str, topic: &str) -> Article {
        let memo_key = digest(raw);
        if let Some(article) = inner.parsed_responses.get(&memo_key) {
            return article;
        }
        match parse_article(raw) {
            Ok(article) => {
                inner.parsed_responses.set(memo_key, article.clone());
                article
            }
            // Fallbacks depend on the topic, so they are never memoized.
            Err(e) => {
                inner.logger.failure(
                    LogLevel::Warn,
                    "article response unparseable; using fallback",
                    &e,
                );
                fallback_article(raw, topic)
            }
        }
    }

    /// Run a full request and package it as a history artifact.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationArtifact> {
        let prepared = self.prepare(request)?;
        let (article, research) = self.article_prepared(prepared.clone()).await?;
        Ok(GenerationArtifact {
            id: uuid::Uuid::new_v4().to_string(),
            request: prepared,
            research,
            article,
            created_at: self.inner.clock.now_ms(),
        })
    }

    pub fn backend_name(&self) -> &'static str {
        self.inner.backend.name()
    }

    pub fn cached_articles(&self) -> usize {
        self.inner.article_cache.len()
    }

    pub fn memoized_responses(&self) -> usize {
        self.inner.parsed_responses.len()
    }
}

#[async_trait]
impl TaskExecutor for GenerationService {
    async fn execute(&self, request: &GenerationRequest) -> Result<GenerationArtifact> {
        self.generate(request).await
    }
}
