//! Request and result types for the generation façade.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Kind of piece to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    #[default]
    BlogPost,
    Article,
    HowTo,
    Listicle,
    ProductReview,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::BlogPost => "blog_post",
            ContentType::Article => "article",
            ContentType::HowTo => "how_to",
            ContentType::Listicle => "listicle",
            ContentType::ProductReview => "product_review",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    #[default]
    Professional,
    Casual,
    Friendly,
    Authoritative,
    Conversational,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Casual => "casual",
            Tone::Friendly => "friendly",
            Tone::Authoritative => "authoritative",
            Tone::Conversational => "conversational",
        }
    }
}

pub const DEFAULT_WORD_COUNT: u32 = 1500;

fn default_true() -> bool {
    true
}

fn default_word_count() -> u32 {
    DEFAULT_WORD_COUNT
}

/// Options that shape a generated article. Missing fields take their defaults
/// when deserialized, so persisted tasks from older versions still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default)]
    pub tone: Tone,
    #[serde(default = "default_true")]
    pub include_faq: bool,
    #[serde(default = "default_true")]
    pub include_schema: bool,
    #[serde(default = "default_word_count")]
    pub word_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            content_type: ContentType::default(),
            tone: Tone::default(),
            include_faq: true,
            include_schema: true,
            word_count: DEFAULT_WORD_COUNT,
            target_audience: None,
            keywords: Vec::new(),
        }
    }
}

impl GenerationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tone = tone;
        self
    }

    pub fn with_faq(mut self, include: bool) -> Self {
        self.include_faq = include;
        self
    }

    pub fn with_schema(mut self, include: bool) -> Self {
        self.include_schema = include;
        self
    }

    pub fn with_word_count(mut self, words: u32) -> Self {
        self.word_count = words;
        self
    }

    pub fn with_target_audience(mut self, audience: impl Into<String>) -> Self {
        self.target_audience = Some(audience.into());
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }
}

/// One logical unit of generation work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub topic: String,
    #[serde(default)]
    pub with_research: bool,
    #[serde(default)]
    pub options: GenerationOptions,
}

impl GenerationRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            with_research: false,
            options: GenerationOptions::default(),
        }
    }

    pub fn with_research(mut self, enabled: bool) -> Self {
        self.with_research = enabled;
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }
}

/// Output of the research step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResearchResult {
    #[serde(default)]
    pub topic: String,
    #[schemars(length(min = 1))]
    pub summary: String,
    #[serde(default, alias = "keyPoints")]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    /// True when this value was synthesized from an unparseable response.
    #[serde(default)]
    pub degraded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FaqEntry {
    #[schemars(length(min = 1))]
    pub question: String,
    #[schemars(length(min = 1))]
    pub answer: String,
}

/// A generated article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Article {
    #[schemars(length(min = 1))]
    pub title: String,
    #[serde(default, alias = "metaDescription")]
    pub meta_description: String,
    #[schemars(length(min = 1))]
    pub content: String,
    #[serde(default)]
    pub faq: Vec<FaqEntry>,
    #[serde(default, alias = "schemaMarkup", skip_serializing_if = "Option::is_none")]
    pub schema_markup: Option<serde_json::Value>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, alias = "wordCount")]
    pub word_count: usize,
    #[serde(default, alias = "readingTime", alias = "readingTimeMinutes")]
    pub reading_time_minutes: u32,
    #[serde(default)]
    pub degraded: bool,
}

/// A completed generation, as appended to history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationArtifact {
    pub id: String,
    pub request: GenerationRequest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research: Option<ResearchResult>,
    pub article: Article,
    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults_applied_on_deserialize() {
        let opts: GenerationOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts, GenerationOptions::default());
        assert!(opts.include_faq);
        assert_eq!(opts.word_count, DEFAULT_WORD_COUNT);
    }

    #[test]
    fn test_request_without_options_uses_defaults() {
        let req: GenerationRequest =
            serde_json::from_str(r#"{"topic":"rust async","options":{"tone":"casual"}}"#).unwrap();
        assert!(!req.with_research);
        assert_eq!(req.options.tone, Tone::Casual);
        assert_eq!(req.options.content_type, ContentType::BlogPost);
        assert!(req.options.include_schema);
    }
}
