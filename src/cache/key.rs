//! Cache key generation.
//!
//! Two requests share a key iff their normalized forms match: topic trimmed and
//! lower-cased, options with defaults applied, keywords normalized and sorted.
//! The canonical form is built from a `BTreeMap`, so field order never matters.

use crate::generation::{GenerationOptions, GenerationRequest};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Which façade operation a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Research,
    Article,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Research => "research",
            RequestKind::Article => "article",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub hash: String,
    pub kind: RequestKind,
}

impl CacheKey {
    pub fn new(kind: RequestKind, hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            kind,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }

    /// Key for the research step of `topic`.
    pub fn for_research(topic: &str) -> Self {
        let mut parts: BTreeMap<&'static str, String> = BTreeMap::new();
        parts.insert("kind", RequestKind::Research.as_str().to_string());
        parts.insert("topic", normalize_topic(topic));
        Self::new(RequestKind::Research, digest(&parts))
    }

    /// Key for a full article request.
    pub fn for_request(request: &GenerationRequest) -> Self {
        Self::new(RequestKind::Article, digest(&canonical_parts(request)))
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.hash)
    }
}

pub fn normalize_topic(topic: &str) -> String {
    topic.trim().to_lowercase()
}

fn normalize_keywords(keywords: &[String]) -> Vec<String> {
    let mut out: Vec<String> = keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}

fn canonical_parts(request: &GenerationRequest) -> BTreeMap<&'static str, String> {
    let GenerationOptions {
        content_type,
        tone,
        include_faq,
        include_schema,
        word_count,
        target_audience,
        keywords,
    } = &request.options;

    let mut parts = BTreeMap::new();
    parts.insert("kind", RequestKind::Article.as_str().to_string());
    parts.insert("topic", normalize_topic(&request.topic));
    parts.insert("with_research", request.with_research.to_string());
    parts.insert("content_type", content_type.as_str().to_string());
    parts.insert("tone", tone.as_str().to_string());
    parts.insert("include_faq", include_faq.to_string());
    parts.insert("include_schema", include_schema.to_string());
    parts.insert("word_count", word_count.to_string());
    parts.insert(
        "target_audience",
        target_audience
            .as_deref()
            .map(normalize_topic)
            .unwrap_or_default(),
    );
    parts.insert("keywords", normalize_keywords(keywords).join(","));
    parts
}

/// The normalized serialization two equal requests share.
pub fn canonical_form(request: &GenerationRequest) -> String {
    serde_json::to_string(&canonical_parts(request)).unwrap_or_default()
}

fn digest(parts: &BTreeMap<&'static str, String>) -> String {
    let canonical = serde_json::to_string(parts).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
