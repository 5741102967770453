//! Token extraction from the login response payload.

use serde_json::Value;

/// Field names that may carry the token when it arrives as an object,
/// in priority order.
const TOKEN_FIELDS: &[&str] = &["tokenValue", "token"];

/// Text left behind when an object is coerced to a string upstream.
const STRINGIFIED_OBJECT: &str = "[object Object]";

/// Pull the token out of a login payload.
///
/// Accepts a bare string or an object carrying `tokenValue` or `token`.
/// Returns `None` for any other shape, for blank tokens, and for the
/// stringified-object artifact.
pub fn extract_login_token(data: &Value) -> Option<String> {
    match data {
        Value::String(token) => usable(token),
        Value::Object(map) => TOKEN_FIELDS.iter().find_map(|field| match map.get(*field) {
            Some(Value::String(token)) => usable(token),
            _ => None,
        }),
        _ => None,
    }
}

fn usable(token: &str) -> Option<String> {
    let token = token.trim();
    if token.is_empty() || token == STRINGIFIED_OBJECT {
        None
    } else {
        Some(token.to_string())
    }
}
