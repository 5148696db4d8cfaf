//! Validation of raw provider responses and fallback synthesis.
//!
//! Responses are expected to be JSON (optionally wrapped in a fenced code block
//! or surrounded by prose). A response that cannot be extracted, fails schema
//! validation, or fails to deserialize is a [`crate::Error::Parse`];
//! [`fallback_article`] and [`fallback_research`] build a degraded-but-valid value
//! from the same raw text instead.

use super::types::{Article, FaqEntry, ResearchResult};
use crate::{Error, Result};
use jsonschema::{Draft, JSONSchema};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;

pub const WORDS_PER_MINUTE: usize = 200;
const META_DESCRIPTION_MAX: usize = 155;
const FALLBACK_KEY_POINTS: usize = 5;

fn compile_schema(schema: schemars::schema::RootSchema) -> Option<JSONSchema> {
    let value = serde_json::to_value(&schema).ok()?;
    match JSONSchema::options().with_draft(Draft::Draft7).compile(&value) {
        Ok(compiled) => Some(compiled),
        Err(e) => {
            tracing::warn!(error = %e, "failed to compile response schema; skipping schema checks");
            None
        }
    }
}

static ARTICLE_SCHEMA: Lazy<Option<JSONSchema>> =
    Lazy::new(|| compile_schema(schemars::schema_for!(Article)));

static RESEARCH_SCHEMA: Lazy<Option<JSONSchema>> =
    Lazy::new(|| compile_schema(schemars::schema_for!(ResearchResult)));

/// Locate the JSON object inside a raw response.
pub fn extract_json(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after[body_start..];
        if let Some(end) = body.find("```") {
            let inner = body[..end].trim();
            if inner.starts_with('{') {
                return Some(inner);
            }
        }
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (end > start).then(|| &trimmed[start..=end])
}

fn parse_validated<T: DeserializeOwned>(
    raw: &str,
    schema: &Option<JSONSchema>,
    what: &str,
) -> Result<T> {
    let body = extract_json(raw)
        .ok_or_else(|| Error::parse(format!("no JSON object found in {} response", what)))?;
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| Error::parse(format!("invalid JSON in {} response: {}", what, e)))?;
    if let Some(schema) = schema {
        if let Err(errors) = schema.validate(&value) {
            let detail: Vec<String> = errors.map(|e| e.to_string()).take(3).collect();
            return Err(Error::parse(format!(
                "{} response failed validation: {}",
                what,
                detail.join("; ")
            )));
        }
    }
    serde_json::from_value(value)
        .map_err(|e| Error::parse(format!("unexpected {} shape: {}", what, e)))
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn reading_time_minutes(words: usize) -> u32 {
    (words.div_ceil(WORDS_PER_MINUTE)).max(1) as u32
}

/// Parse an article response, filling derived counters the provider omitted.
pub fn parse_article(raw: &str) -> Result<Article> {
    let mut article: Article = parse_validated(raw, &ARTICLE_SCHEMA, "article")?;
    if article.title.trim().is_empty() || article.content.trim().is_empty() {
        return Err(Error::parse("article response is missing title or content"));
    }
    if article.word_count == 0 {
        article.word_count = word_count(&article.content);
    }
    if article.reading_time_minutes == 0 {
        article.reading_time_minutes = reading_time_minutes(article.word_count);
    }
    if article.meta_description.trim().is_empty() {
        article.meta_description = truncate_chars(&article.content, META_DESCRIPTION_MAX);
    }
    Ok(article)
}

/// Parse a research response.
pub fn parse_research(raw: &str, topic: &str) -> Result<ResearchResult> {
    let mut research: ResearchResult = parse_validated(raw, &RESEARCH_SCHEMA, "research")?;
    if research.summary.trim().is_empty() {
        return Err(Error::parse("research response is missing a summary"));
    }
    if research.topic.trim().is_empty() {
        research.topic = topic.to_string();
    }
    Ok(research)
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn truncate_chars(s: &str, max: usize) -> String {
    let flat = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let mut out: String = flat.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

fn first_sentence(text: &str) -> Option<String> {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.is_empty() {
        return None;
    }
    let end = flat
        .find(|c| matches!(c, '.' | '!' | '?'))
        .map(|i| i + 1)
        .unwrap_or(flat.len());
    Some(truncate_chars(&flat[..end], 300))
}

/// Deterministic stand-in for an article whose response could not be parsed.
///
/// The raw text becomes the body; title, meta description and a one-entry FAQ are
/// derived from the topic; `word_count` is the whitespace-token count of `raw`.
pub fn fallback_article(raw: &str, topic: &str) -> Article {
    let topic = topic.trim();
    let subject = if topic.is_empty() { "This Topic" } else { topic };
    let words = word_count(raw);
    let title = format!("{}: A Complete Guide", title_case(subject));
    let meta_description = format!(
        "Discover everything you need to know about {}: key insights, practical tips, and answers to common questions.",
        subject
    );
    let answer = first_sentence(raw).unwrap_or_else(|| meta_description.clone());

    Article {
        title,
        meta_description,
        content: raw.trim().to_string(),
        faq: vec![FaqEntry {
            question: format!("What should I know about {}?", subject),
            answer,
        }],
        schema_markup: None,
        keywords: if topic.is_empty() {
            Vec::new()
        } else {
            vec![topic.to_lowercase()]
        },
        word_count: words,
        reading_time_minutes: reading_time_minutes(words),
        degraded: true,
    }
}

/// Deterministic stand-in for a research result whose response could not be parsed.
pub fn fallback_research(raw: &str, topic: &str) -> ResearchResult {
    let key_points: Vec<String> = raw
        .lines()
        .map(|l| l.trim().trim_start_matches(|c: char| c == '-' || c == '*' || c == '•').trim())
        .filter(|l| !l.is_empty())
        .take(FALLBACK_KEY_POINTS)
        .map(str::to_string)
        .collect();
    let summary = first_sentence(raw).unwrap_or_else(|| format!("Research notes on {}.", topic));
    ResearchResult {
        topic: topic.to_string(),
        summary,
        key_points,
        keywords: vec![topic.to_lowercase()],
        sources: Vec::new(),
        degraded: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "title": "Remote Work Tips",
        "metaDescription": "Work well from home.",
        "content": "Set a schedule. Take breaks. Communicate often.",
        "faq": [{"question": "How?", "answer": "Like this."}]
    }"#;

    #[test]
    fn test_parses_plain_json_and_fills_counters() {
        let article = parse_article(VALID).unwrap();
        assert_eq!(article.title, "Remote Work Tips");
        assert_eq!(article.meta_description, "Work well from home.");
        assert_eq!(article.word_count, 7);
        assert_eq!(article.reading_time_minutes, 1);
        assert!(!article.degraded);
    }

    #[test]
    fn test_parses_fenced_json_with_prose() {
        let raw = format!("Here is your article:\n```json\n{}\n```\nEnjoy!", VALID);
        assert_eq!(parse_article(&raw).unwrap().faq.len(), 1);
    }

    #[test]
    fn test_rejects_non_json() {
        let err = parse_article("Sorry, I cannot help with that.").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_rejects_schema_violations() {
        // title must be a non-empty string
        assert!(parse_article(r#"{"title": "", "content": "x"}"#).is_err());
        assert!(parse_article(r#"{"title": 5, "content": "x"}"#).is_err());
        assert!(parse_article(r#"{"content": "x"}"#).is_err());
    }

    #[test]
    fn test_fallback_article_shape() {
        let raw = "Remote work is here to stay. Teams need new habits!\nMore text follows here.";
        let article = fallback_article(raw, "remote work tips");
        assert_eq!(article.title, "Remote Work Tips: A Complete Guide");
        assert!(!article.meta_description.is_empty());
        assert_eq!(article.faq.len(), 1);
        assert_eq!(article.faq[0].answer, "Remote work is here to stay.");
        assert_eq!(article.word_count, raw.split_whitespace().count());
        assert_eq!(article.reading_time_minutes, 1);
        assert!(article.degraded);
    }

    #[test]
    fn test_fallback_article_is_deterministic_and_handles_empty_input() {
        assert_eq!(fallback_article("abc def", "x"), fallback_article("abc def", "x"));
        let empty = fallback_article("", "");
        assert!(!empty.title.is_empty());
        assert!(!empty.faq.is_empty());
        assert!(!empty.faq[0].answer.is_empty());
        assert_eq!(empty.word_count, 0);
    }

    #[test]
    fn test_research_parse_and_fallback() {
        let ok = parse_research(r#"{"summary": "Async Rust.", "keyPoints": ["tokio"]}"#, "rust").unwrap();
        assert_eq!(ok.topic, "rust");
        assert_eq!(ok.key_points, vec!["tokio"]);

        let fb = fallback_research("- first point\n- second point\n\n* third", "rust");
        assert_eq!(fb.key_points, vec!["first point", "second point", "third"]);
        assert!(fb.degraded);
        assert_eq!(fb.topic, "rust");
    }

    #[test]
    fn test_reading_time_rounds_up() {
        assert_eq!(reading_time_minutes(0), 1);
        assert_eq!(reading_time_minutes(200), 1);
        assert_eq!(reading_time_minutes(201), 2);
    }
}
