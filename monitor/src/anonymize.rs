//! Best-effort redaction of personal data in free-form context maps
//!
//! Matching is a case-insensitive substring test on keys, so it over-redacts
//! (`zip` contains `ip`) and under-redacts values stored under innocuous
//! keys. This is not a compliance-grade scrubber.

use serde_json::{Map, Value};

pub const REDACTED: &str = "[REDACTED]";

/// Key fragments whose values are replaced
pub const SENSITIVE_KEYS: [&str; 9] = [
    "user", "email", "name", "phone", "address", "ip", "password", "token", "session",
];

pub fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SENSITIVE_KEYS.iter().any(|fragment| key.contains(fragment))
}

/// Redact sensitive keys at any depth, including inside arrays
pub fn anonymize(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(key, value)| {
            let value = if is_sensitive_key(key) {
                Value::String(REDACTED.to_string())
            } else {
                anonymize_value(value)
            };
            (key.clone(), value)
        })
        .collect()
}

pub fn anonymize_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(anonymize(map)),
        Value::Array(items) => Value::Array(items.iter().map(anonymize_value).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_redacts_top_level_keys() {
        let context = as_map(json!({
            "userId": 42,
            "Email": "a@b.c",
            "route": "/checkout",
        }));
        let redacted = anonymize(&context);
        assert_eq!(redacted["userId"], json!(REDACTED));
        assert_eq!(redacted["Email"], json!(REDACTED));
        assert_eq!(redacted["route"], json!("/checkout"));
    }

    #[test]
    fn test_redacts_nested_keys() {
        let context = as_map(json!({
            "request": {
                "headers": { "authToken": "abc", "accept": "json" },
                "clients": [{ "ipAddress": "10.0.0.1", "port": 443 }]
            }
        }));
        let redacted = anonymize(&context);
        assert_eq!(redacted["request"]["headers"]["authToken"], json!(REDACTED));
        assert_eq!(redacted["request"]["headers"]["accept"], json!("json"));
        assert_eq!(redacted["request"]["clients"][0]["ipAddress"], json!(REDACTED));
        assert_eq!(redacted["request"]["clients"][0]["port"], json!(443));
    }

    #[test]
    fn test_sensitive_object_is_replaced_whole() {
        let context = as_map(json!({ "user": { "id": 1, "plan": "pro" } }));
        assert_eq!(anonymize(&context)["user"], json!(REDACTED));
    }
}
