//! Secret redaction for log fields.

use serde_json::{Map, Value};

const REDACTED: &str = "[REDACTED]";

/// Field names whose values are never written out.
const DENYLIST_KEYS: &[&str] = &[
    "token",
    "satoken",
    "password",
    "authorization",
    "secret",
    "cookie",
];

/// Returns true if a field name refers to credential material.
pub fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    DENYLIST_KEYS.iter().any(|entry| lower.contains(entry))
}

/// Redact a field value, recursing into objects and arrays.
pub fn sanitize_value(key: &str, value: &Value) -> Value {
    if is_sensitive_key(key) {
        return Value::String(REDACTED.to_string());
    }

    match value {
        Value::String(s) if looks_like_bearer(s) => Value::String(REDACTED.to_string()),
        Value::Object(map) => {
            let mut out = Map::new();
            for (k, v) in map {
                out.insert(k.clone(), sanitize_value(k, v));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| sanitize_value(key, item))
                .collect::<Vec<_>>(),
        ),
        _ => value.clone(),
    }
}

fn looks_like_bearer(raw: &str) -> bool {
    raw.trim_start().to_ascii_lowercase().starts_with("bearer ")
}

/// Mask the token following every `Bearer ` in free-form text.
pub fn scrub_message(message: &str) -> String {
    const SCHEME: &str = "bearer ";
    // Lowercasing ASCII keeps byte offsets aligned with `message`.
    let lower = message.to_ascii_lowercase();
    let mut out = String::with_capacity(message.len());
    let mut cursor = 0;

    while let Some(found) = lower[cursor..].find(SCHEME) {
        let token_start = cursor + found + SCHEME.len();
        let token_end = message[token_start..]
            .find(char::is_whitespace)
            .map_or(message.len(), |offset| token_start + offset);
        out.push_str(&message[cursor..token_start]);
        if token_end > token_start {
            out.push_str(REDACTED);
        }
        cursor = token_end;
    }

    out.push_str(&message[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sensitive_keys_match_case_insensitively() {
        assert!(is_sensitive_key("token"));
        assert!(is_sensitive_key("SaToken"));
        assert!(is_sensitive_key("Authorization"));
        assert!(is_sensitive_key("new_password"));
        assert!(!is_sensitive_key("username"));
        assert!(!is_sensitive_key("status"));
    }

    #[test]
    fn redacts_sensitive_key_values() {
        assert_eq!(
            sanitize_value("token", &json!("abc")),
            Value::String(REDACTED.to_string())
        );
    }

    #[test]
    fn redacts_bearer_strings_under_any_key() {
        assert_eq!(
            sanitize_value("header", &json!("Bearer abc.def")),
            Value::String(REDACTED.to_string())
        );
        assert_eq!(sanitize_value("header", &json!("plain")), json!("plain"));
    }

    #[test]
    fn scrubs_bearer_tokens_inside_messages() {
        assert_eq!(
            scrub_message("sent Bearer abc.def to server"),
            "sent Bearer [REDACTED] to server"
        );
        assert_eq!(
            scrub_message("bearer one, BEARER two"),
            "bearer [REDACTED] BEARER [REDACTED]"
        );
        assert_eq!(scrub_message("no credentials here"), "no credentials here");
        assert_eq!(scrub_message("trailing Bearer "), "trailing Bearer ");
    }

    #[test]
    fn recurses_into_nested_objects() {
        let value = json!({ "user": "admin", "auth": { "tokenValue": "abc" } });
        let sanitized = sanitize_value("payload", &value);
        assert_eq!(sanitized["user"], json!("admin"));
        assert_eq!(sanitized["auth"]["tokenValue"], json!(REDACTED));
    }
}
