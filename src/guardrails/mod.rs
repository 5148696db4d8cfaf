//! 输入防护模块：在任何远程调用之前对用户输入进行清洗与长度校验。
//!
//! # Guardrails Module
//!
//! Outbound requests pass through this module before they reach a generation
//! backend. It is a precondition check, not a general text cleaner:
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`sanitize_input`] | Strip characters outside word chars, whitespace and `- . , ! ?` |
//! | [`validate_prompt_length`] | Reject inputs longer than the configured bound |
//! | [`prepare_topic`] | Sanitize, trim, reject empty, then length-check |
//!
//! ## Example
//!
//! ```rust
//! use ai_gen_pipeline::guardrails::{prepare_topic, DEFAULT_MAX_PROMPT_LENGTH};
//!
//! let topic = prepare_topic("  remote <work> tips!  ", DEFAULT_MAX_PROMPT_LENGTH).unwrap();
//! assert_eq!(topic, "remote work tips!");
//! ```

mod sanitize;

pub use sanitize::{
    prepare_topic, sanitize_input, validate_prompt_length, DEFAULT_MAX_PROMPT_LENGTH,
};
