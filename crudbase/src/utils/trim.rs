//! Whitespace normalisation for user-supplied text.
//!
//! Every string that reaches the data store goes through [`trim_str`]: ends are
//! trimmed, internal runs of spaces collapse to a single space and a string
//! that is empty afterwards becomes `None` (stored as NULL).

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static SPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").expect("valid regex"));

/// Trim a string. Returns `None` when nothing but whitespace is left.
pub fn trim_str(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(SPACE_RUNS.replace_all(trimmed, " ").into_owned())
}

/// Recursively trim every string inside a JSON value.
///
/// Strings that trim to nothing become `null`; arrays and objects keep their
/// shape. Other scalars are returned as-is.
pub fn trim_value(value: Value) -> Value {
    match value {
        Value::String(s) => trim_str(&s).map(Value::String).unwrap_or(Value::Null),
        Value::Array(items) => Value::Array(items.into_iter().map(trim_value).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, v)| (key, trim_value(v)))
                .collect(),
        ),
        other => other,
    }
}
