//! Cache key derivation.
//!
//! Request parameters are normalized and serialized to a canonical string,
//! then hashed with SHA-256. Normalization rules:
//!
//! - object keys are emitted in sorted order
//! - `null` members are dropped (absent and null mean the same thing)
//! - string values are trimmed and lowercased, unless they sit under a field
//!   declared case-sensitive (URLs, ticker symbols on case-sensitive venues)
//! - floats with no fractional part are written as integers, so `5` and
//!   `5.0` share a key

use std::collections::HashSet;
use std::fmt;

use serde_json::{Number, Value};
use sha2::{Digest, Sha256};

/// A fixed-length (64 hex chars) digest identifying a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// The hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rules for turning request parameters into a [`CacheKey`].
#[derive(Debug, Clone, Default)]
pub struct KeyPolicy {
    case_sensitive: HashSet<String>,
}

impl KeyPolicy {
    /// A policy that case-folds every string value.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep string values under `field` (at any depth) case-sensitive.
    pub fn case_sensitive(mut self, field: impl Into<String>) -> Self {
        self.case_sensitive.insert(field.into());
        self
    }

    /// Whether string values under `field` keep their case.
    pub fn is_case_sensitive(&self, field: &str) -> bool {
        self.case_sensitive.contains(field)
    }

    /// Derive the key for a parameter set.
    pub fn key(&self, params: &Value) -> CacheKey {
        let canonical = self.canonical(params);

        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        let hash: String = hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();

        CacheKey(hash)
    }

    /// The canonical string form that gets hashed.
    pub fn canonical(&self, params: &Value) -> String {
        let mut out = String::new();
        self.write_canonical(params, false, &mut out);
        out
    }

    fn write_canonical(&self, value: &Value, keep_case: bool, out: &mut String) {
        match value {
            Value::Null => out.push_str("null"),
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Number(n) => out.push_str(&canonical_number(n)),
            Value::String(s) => {
                let trimmed = s.trim();
                let normalized = if keep_case {
                    trimmed.to_string()
                } else {
                    trimmed.to_lowercase()
                };
                out.push_str(&Value::String(normalized).to_string());
            }
            Value::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    self.write_canonical(item, keep_case, out);
                }
                out.push(']');
            }
            Value::Object(map) => {
                let mut fields: Vec<(&String, &Value)> =
                    map.iter().filter(|(_, v)| !v.is_null()).collect();
                fields.sort_by(|a, b| a.0.cmp(b.0));

                out.push('{');
                for (i, (name, field_value)) in fields.into_iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    out.push_str(&Value::String(name.clone()).to_string());
                    out.push(':');
                    let keep = keep_case || self.is_case_sensitive(name);
                    self.write_canonical(field_value, keep, out);
                }
                out.push('}');
            }
        }
    }
}

fn canonical_number(n: &Number) -> String {
    if n.is_f64()
        && let Some(f) = n.as_f64()
        && f.is_finite()
        && f.fract() == 0.0
        && f >= i64::MIN as f64
        && f < i64::MAX as f64
    {
        return (f as i64).to_string();
    }
    n.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_is_fixed_length_hex() {
        let key = KeyPolicy::new().key(&json!({"query": "rust"}));
        assert_eq!(key.as_str().len(), 64);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_key_ignores_member_order() {
        let policy = KeyPolicy::new();
        let a = json!({"query": "rust", "max_results": 5, "topic": "news"});
        let b = json!({"topic": "news", "query": "rust", "max_results": 5});
        assert_eq!(policy.key(&a), policy.key(&b));
    }

    #[test]
    fn test_key_ignores_case_and_padding() {
        let policy = KeyPolicy::new();
        let a = json!({"query": "Rust Async"});
        let b = json!({"query": "  rust async "});
        assert_eq!(policy.key(&a), policy.key(&b));
    }

    #[test]
    fn test_key_drops_null_members() {
        let policy = KeyPolicy::new();
        let a = json!({"query": "rust", "topic": null});
        let b = json!({"query": "rust"});
        assert_eq!(policy.key(&a), policy.key(&b));
    }

    #[test]
    fn test_nested_objects_are_canonical() {
        let policy = KeyPolicy::new();
        let a = json!({"filter": {"b": 1, "a": "X"}});
        let b = json!({"filter": {"a": "x", "b": 1}});
        assert_eq!(policy.key(&a), policy.key(&b));
    }

    #[test]
    fn test_case_sensitive_field_keeps_case() {
        let policy = KeyPolicy::new().case_sensitive("urls");
        let a = json!({"urls": ["https://example.com/Page"]});
        let b = json!({"urls": ["https://example.com/page"]});
        assert_ne!(policy.key(&a), policy.key(&b));

        // Other fields are still folded.
        let c = json!({"urls": ["https://example.com/Page"], "format": "MARKDOWN"});
        let d = json!({"urls": ["https://example.com/Page"], "format": "markdown"});
        assert_eq!(policy.key(&c), policy.key(&d));
    }

    #[test]
    fn test_different_values_differ() {
        let policy = KeyPolicy::new();
        assert_ne!(
            policy.key(&json!({"query": "rust"})),
            policy.key(&json!({"query": "go"}))
        );
        assert_ne!(
            policy.key(&json!({"max_results": 5})),
            policy.key(&json!({"max_results": "5"}))
        );
    }

    #[test]
    fn test_canonical_form() {
        let policy = KeyPolicy::new();
        assert_eq!(
            policy.canonical(&json!({"b": [1, "Two"], "a": true})),
            r#"{"a":true,"b":[1,"two"]}"#
        );
    }

    #[test]
    fn test_integral_floats_share_key() {
        let policy = KeyPolicy::new();
        let a = json!({"query": "rust", "max_results": 5});
        let b = json!({"query": "rust", "max_results": 5.0});
        assert_eq!(policy.canonical(&b), r#"{"max_results":5,"query":"rust"}"#);
        assert_eq!(policy.key(&a), policy.key(&b));

        assert_eq!(policy.canonical(&json!({"n": -0.0})), r#"{"n":0}"#);
        assert_ne!(
            policy.key(&json!({"max_results": 5})),
            policy.key(&json!({"max_results": 5.5}))
        );
    }
}
