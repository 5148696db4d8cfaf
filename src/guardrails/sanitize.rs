//! Input sanitization and length validation.

use crate::{Error, ErrorContext, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// Upper bound on outbound prompt length, in characters.
pub const DEFAULT_MAX_PROMPT_LENGTH: usize = 4000;

static DISALLOWED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^\w\s\-.,!?]").expect("disallowed-character pattern is valid")
});

/// Remove every character outside `[word chars, whitespace, - . , ! ?]` and trim.
pub fn sanitize_input(input: &str) -> String {
    DISALLOWED.replace_all(input, "").trim().to_string()
}

/// Fail with a validation error when `input` exceeds `max_length` characters.
pub fn validate_prompt_length(input: &str, max_length: usize) -> Result<()> {
    let len = input.chars().count();
    if len > max_length {
        return Err(Error::validation_with_context(
            format!("Prompt exceeds maximum length of {} characters", max_length),
            ErrorContext::new()
                .with_field_path("request.topic")
                .with_details(format!("length: {}", len))
                .with_source("sanitizer"),
        ));
    }
    Ok(())
}

/// Sanitize a user-supplied topic and check it is usable as an outbound prompt.
pub fn prepare_topic(input: &str, max_length: usize) -> Result<String> {
    let cleaned = sanitize_input(input);
    if cleaned.is_empty() {
        return Err(Error::validation_with_context(
            "Topic is empty after sanitization",
            ErrorContext::new()
                .with_field_path("request.topic")
                .with_source("sanitizer"),
        ));
    }
    validate_prompt_length(&cleaned, max_length)?;
    Ok(cleaned)
}
