//! Recursive redaction of structured log payloads.

use serde_json::{Map, Value};

/// Replacement for any value stored under a sensitive key.
pub const REDACTED: &str = "[REDACTED]";

const SENSITIVE_KEYS: &[&str] = &[
    "api",
    "key",
    "token",
    "secret",
    "authorization",
    "password",
    "content",
];

/// True if a mapping key names something that must not be logged.
pub fn is_sensitive_key(key: &str) -> bool {
    let k = key.to_lowercase();
    SENSITIVE_KEYS.iter().any(|s| k.contains(s))
}

/// Return a copy of `value` with every sensitive key's value replaced wholesale,
/// recursing through nested objects and arrays.
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (k, v) in map {
                if is_sensitive_key(k) {
                    out.insert(k.clone(), Value::String(REDACTED.to_string()));
                } else {
                    out.insert(k.clone(), redact(v));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

/// Reduce an error to `{name, message}` so backtraces and nested sources stay out of logs.
pub fn error_value(err: &crate::Error) -> Value {
    serde_json::json!({
        "name": err.kind(),
        "message": err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_redacts_api_key_any_case() {
        for key in ["apiKey", "APIKEY", "x-api-key", "openai_api_key"] {
            let mut map = Map::new();
            map.insert(key.to_string(), json!("secret-value"));
            let v = redact(&Value::Object(map));
            assert_eq!(v[key], REDACTED, "key {} should be redacted", key);
        }
    }

    #[test]
    fn test_redacts_recursively_through_arrays() {
        let input = json!({
            "requests": [
                { "topic": "rust", "apiKey": "k1" },
                { "nested": { "Authorization": "Bearer abc", "attempt": 2 } }
            ],
            "status": "failed"
        });
        let out = redact(&input);
        assert_eq!(out["requests"][0]["apiKey"], REDACTED);
        assert_eq!(out["requests"][0]["topic"], "rust");
        assert_eq!(out["requests"][1]["nested"]["Authorization"], REDACTED);
        assert_eq!(out["requests"][1]["nested"]["attempt"], 2);
        assert_eq!(out["status"], "failed");
        assert!(!out.to_string().contains("Bearer abc"));
    }

    #[test]
    fn test_sensitive_key_replaces_whole_subtree() {
        let out = redact(&json!({ "content": { "title": "t", "body": ["a", "b"] } }));
        assert_eq!(out["content"], REDACTED);
    }

    #[test]
    fn test_scalars_pass_through() {
        assert_eq!(redact(&json!(42)), json!(42));
        assert_eq!(redact(&json!("plain")), json!("plain"));
        assert_eq!(redact(&json!(null)), json!(null));
    }

    #[test]
    fn test_error_value_is_name_and_message() {
        let err = crate::Error::network("connection refused", None, None);
        let v = error_value(&err);
        assert_eq!(v["name"], "NetworkError");
        assert!(v["message"].as_str().unwrap().contains("connection refused"));
        assert_eq!(v.as_object().unwrap().len(), 2);
    }
}
