use crate::config::PipelineConfig;
use crate::error::ErrorContext;
use crate::generation::{GenerationBackend, GenerationRequest, ResearchResult};
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const MAX_ERROR_BODY_CHARS: usize = 512;

/// Generation backend that talks to a JSON proxy over HTTP.
///
/// `POST {base}/research` with `{"topic"}` and `POST {base}/generate` with the
/// request (plus research, when present). The response body is returned as-is;
/// interpreting it is the façade's job.
pub struct HttpGenerationBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpGenerationBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let parsed = url::Url::parse(base_url).map_err(|e| {
            Error::configuration_with_context(
                "invalid backend URL",
                ErrorContext::new()
                    .with_field_path("config.backend_url")
                    .with_details(e.to_string())
                    .with_source("http_backend"),
            )
        })?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
            .map_err(|e| {
                Error::runtime_with_context(
                    "failed to build HTTP client",
                    ErrorContext::new()
                        .with_details(e.to_string())
                        .with_source("http_backend"),
                )
            })?;

        Ok(Self {
            client,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            api_key: None,
        })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let backend = Self::new(&config.backend_url, config.http_timeout())?;
        Ok(match &config.api_key {
            Some(key) => backend.with_api_key(key.clone()),
            None => backend,
        })
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post(&self, path: &str, body: &serde_json::Value) -> Result<String> {
        let url = format!("{}/{}", self.base_url, path);
        let mut req = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(|e| transport_error(path, &e))?;
        let status = resp.status();
        debug!(path, status = status.as_u16(), "backend responded");

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            return Err(Error::network(
                format!("{} returned HTTP {}", path, status.as_u16()),
                Some(excerpt.as_str()).filter(|s| !s.is_empty()),
                Some(status.as_u16()),
            ));
        }

        resp.text().await.map_err(|e| transport_error(path, &e))
    }
}

fn transport_error(path: &str, err: &reqwest::Error) -> Error {
    // reqwest's timeout text varies; make sure the classifier sees it as one.
    let cause = if err.is_timeout() {
        format!("timeout: {}", err)
    } else {
        err.to_string()
    };
    Error::network(format!("request to {} failed", path), Some(&cause), None)
}

#[async_trait]
impl GenerationBackend for HttpGenerationBackend {
    async fn research(&self, topic: &str) -> Result<String> {
        self.post("research", &json!({ "topic": topic })).await
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        research: Option<&ResearchResult>,
    ) -> Result<String> {
        let body = json!({
            "topic": request.topic,
            "with_research": request.with_research,
            "options": request.options,
            "research": research,
        });
        self.post("generate", &body).await
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
