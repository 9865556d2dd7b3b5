//! Argument redaction
//!
//! Secret-looking substrings in outbound tool arguments are swapped for
//! placeholders; the same placeholders found anywhere in the tool's result
//! are swapped back, so the provider never sees the secret but the script
//! still gets a faithful result.

use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Placeholder ↔ original pairs produced by one `redact` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Redactions {
    by_placeholder: Vec<(String, String)>,
}

impl Redactions {
    pub fn is_empty(&self) -> bool {
        self.by_placeholder.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_placeholder.len()
    }
}

pub trait Redactor: Send + Sync {
    fn redact(&self, args: Value) -> (Value, Redactions);

    fn restore(&self, result: Value, redactions: &Redactions) -> Value;
}

/// Pass-through
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRedactor;

impl Redactor for NoopRedactor {
    fn redact(&self, args: Value) -> (Value, Redactions) {
        (args, Redactions::default())
    }

    fn restore(&self, result: Value, _redactions: &Redactions) -> Value {
        result
    }
}

/// Default secret shapes
pub const DEFAULT_PATTERNS: &[&str] = &[
    // Bearer tokens
    r"(?i)bearer\s+[a-z0-9._~+/=-]{8,}",
    // AWS access key ids
    r"\b(?:AKIA|ASIA)[0-9A-Z]{16}\b",
    // GitHub tokens
    r"\bgh[pousr]_[A-Za-z0-9]{36,}\b",
    r"\bgithub_pat_[A-Za-z0-9_]{22,}\b",
    // E-mail addresses
    r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}",
];

/// Regex-driven redactor working on every string leaf
#[derive(Debug, Clone)]
pub struct PatternRedactor {
    patterns: Vec<Regex>,
}

impl PatternRedactor {
    pub fn new(patterns: Vec<Regex>) -> Self {
        Self { patterns }
    }

    pub fn from_patterns<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let compiled = patterns
            .into_iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(compiled))
    }

    /// Redactor over [`DEFAULT_PATTERNS`]
    pub fn with_defaults() -> Self {
        let patterns = DEFAULT_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();
        Self::new(patterns)
    }

    fn redact_str(&self, text: &str, seen: &mut HashMap<String, String>, out: &mut Redactions) -> String {
        let mut current = text.to_string();
        for pattern in &self.patterns {
            if !pattern.is_match(&current) {
                continue;
            }
            current = pattern
                .replace_all(&current, |caps: &regex::Captures| {
                    let secret = caps[0].to_string();
                    seen.entry(secret.clone())
                        .or_insert_with(|| {
                            let placeholder = format!("[REDACTED_{}]", out.by_placeholder.len());
                            out.by_placeholder.push((placeholder.clone(), secret));
                            placeholder
                        })
                        .clone()
                })
                .into_owned();
        }
        current
    }

    fn redact_value(&self, value: Value, seen: &mut HashMap<String, String>, out: &mut Redactions) -> Value {
        match value {
            Value::String(s) => Value::String(self.redact_str(&s, seen, out)),
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|v| self.redact_value(v, seen, out))
                    .collect(),
            ),
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, self.redact_value(v, seen, out)))
                    .collect(),
            ),
            other => other,
        }
    }
}

impl Default for PatternRedactor {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl Redactor for PatternRedactor {
    fn redact(&self, args: Value) -> (Value, Redactions) {
        let mut seen = HashMap::new();
        let mut redactions = Redactions::default();
        let args = self.redact_value(args, &mut seen, &mut redactions);
        if !redactions.is_empty() {
            debug!("Redacted {} value(s) from tool arguments", redactions.len());
        }
        (args, redactions)
    }

    fn restore(&self, result: Value, redactions: &Redactions) -> Value {
        if redactions.is_empty() {
            return result;
        }
        restore_value(result, redactions)
    }
}

fn restore_value(value: Value, redactions: &Redactions) -> Value {
    match value {
        Value::String(mut s) => {
            for (placeholder, secret) in &redactions.by_placeholder {
                if s.contains(placeholder.as_str()) {
                    s = s.replace(placeholder.as_str(), secret);
                }
            }
            Value::String(s)
        }
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|v| restore_value(v, redactions))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, restore_value(v, redactions)))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_redact_and_restore() {
        let redactor = PatternRedactor::with_defaults();
        let args = json!({
            "owner": "ops@example.com",
            "headers": ["Authorization: Bearer abcdef123456"],
            "count": 3
        });

        let (redacted, redactions) = redactor.redact(args);
        assert_eq!(redactions.len(), 2);
        assert_eq!(redacted["owner"], "[REDACTED_0]");
        assert_eq!(redacted["headers"][0], "Authorization: [REDACTED_1]");
        assert_eq!(redacted["count"], 3);

        let result = json!({"echo": "sent to [REDACTED_0]", "n": 1});
        let restored = redactor.restore(result, &redactions);
        assert_eq!(restored, json!({"echo": "sent to ops@example.com", "n": 1}));
    }

    #[test]
    fn test_repeated_secret_shares_placeholder() {
        let redactor = PatternRedactor::with_defaults();
        let (redacted, redactions) =
            redactor.redact(json!(["a@b.io", "again a@b.io"]));
        assert_eq!(redactions.len(), 1);
        assert_eq!(redacted, json!(["[REDACTED_0]", "again [REDACTED_0]"]));
    }

    #[test]
    fn test_noop() {
        let (args, redactions) = NoopRedactor.redact(json!({"token": "ghp_x"}));
        assert!(redactions.is_empty());
        assert_eq!(args, json!({"token": "ghp_x"}));
    }

    #[test]
    fn test_custom_patterns() {
        let redactor = PatternRedactor::from_patterns(["secret-[0-9]+"]).unwrap();
        let (redacted, redactions) = redactor.redact(json!("use secret-42 now"));
        assert_eq!(redacted, json!("use [REDACTED_0] now"));
        assert_eq!(redactor.restore(redacted, &redactions), json!("use secret-42 now"));
        assert!(PatternRedactor::from_patterns(["("]).is_err());
    }
}
