//! Config redaction: produce safe-to-share config snapshots by masking secrets.

use serde_json::Value;

/// Keys whose string values are secrets.
static SECRET_KEYS: &[&str] = &[
    "apiKey",
    "api_key",
    "apikey",
    "accessToken",
    "access_token",
    "token",
    "secret",
    "password",
];

/// Redact a config JSON value, masking every secret field.
///
/// Unresolved `${VAR}` references are not secrets and are kept as written.
pub fn redact(value: &Value) -> Value {
    redact_recursive(value, "")
}

fn is_sensitive_key(key: &str) -> bool {
    SECRET_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

fn redact_string(s: &str, key: &str) -> Value {
    if !is_sensitive_key(key) || s.is_empty() || crate::env::is_env_reference(s) {
        return Value::String(s.to_string());
    }
    // Preserve a short hint: first 4 chars + ***
    let hint = if s.chars().count() > 8 {
        format!("{}***", s.chars().take(4).collect::<String>())
    } else {
        "***".to_string()
    };
    Value::String(hint)
}

fn redact_recursive(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) => redact_string(s, key),
        Value::Array(arr) => Value::Array(arr.iter().map(|v| redact_recursive(v, key)).collect()),
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (k, v) in map {
                result.insert(k.clone(), redact_recursive(v, k));
            }
            Value::Object(result)
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redacts_api_key() {
        let v = json!({ "model": { "provider": "gemini", "apiKey": "AIzaSyabcdef123456" } });
        let redacted = redact(&v);
        assert_eq!(redacted["model"]["apiKey"], "AIza***");
        assert_eq!(redacted["model"]["provider"], "gemini");
    }

    #[test]
    fn short_secrets_are_fully_masked() {
        let redacted = redact(&json!({ "apiKey": "abc" }));
        assert_eq!(redacted["apiKey"], "***");
    }

    #[test]
    fn env_references_are_shown_as_written() {
        let v = json!({ "model": { "apiKey": "${GEMINI_API_KEY}" } });
        assert_eq!(redact(&v), v);
    }
}
