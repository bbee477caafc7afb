//! SQLite helper utilities for type conversion
//!
//! SQLite has no native timestamp or JSON column types. Timestamps are stored
//! as canonical ISO-8601 TEXT and nested data as JSON TEXT; these helpers
//! decode them inside `Entity::from_row` implementations.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use crate::utils::parse_date;

// ============================================================================
// Timestamp Helpers
// ============================================================================

/// Parse a TEXT timestamp column.
pub fn decode_timestamp(s: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    parse_date(s).ok_or_else(|| sqlx::Error::Decode(format!("Invalid timestamp '{}'", s).into()))
}

/// Parse a nullable TEXT timestamp column.
pub fn decode_timestamp_opt(s: Option<&str>) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    s.map(decode_timestamp).transpose()
}

// ============================================================================
// JSON Helpers (stored as TEXT in SQLite)
// ============================================================================

/// Deserialize a JSON TEXT column.
pub fn decode_json<T: DeserializeOwned>(s: &str) -> Result<T, sqlx::Error> {
    serde_json::from_str(s).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

/// Deserialize a nullable JSON TEXT column, using `T::default()` for NULL.
pub fn decode_json_or_default<T: DeserializeOwned + Default>(
    s: Option<&str>,
) -> Result<T, sqlx::Error> {
    match s {
        Some(s) => decode_json(s),
        None => Ok(T::default()),
    }
}
