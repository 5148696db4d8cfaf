//! 生成门面模块：研究主题与生成文章，经过缓存、合并、重试与解析回退。
//!
//! # Generation Module
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`GenerationService`] | Façade: sanitize → cache/coalesce → retry → parse/fallback |
//! | [`GenerationBackend`] | Opaque remote provider capability |
//! | [`GenerationRequest`] | Topic, research flag and [`GenerationOptions`] |
//! | [`Article`] / [`ResearchResult`] | Validated results |
//! | [`fallback_article`] | Degraded-but-valid result synthesized from raw text |

mod backend;
mod facade;
mod parse;
mod types;

pub use backend::GenerationBackend;
pub use facade::{GenerationService, GenerationServiceBuilder, DEFAULT_RESPONSE_MEMO_CAPACITY};
pub use parse::{
    extract_json, fallback_article, fallback_research, parse_article, parse_research,
    reading_time_minutes, word_count,
};
pub use types::{
    Article, ContentType, FaqEntry, GenerationArtifact, GenerationOptions, GenerationRequest,
    ResearchResult, Tone, DEFAULT_WORD_COUNT,
};
