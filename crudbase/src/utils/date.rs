//! Timestamp formatting.
//!
//! The canonical text form is the one produced by JavaScript's
//! `Date#toISOString`: UTC, millisecond precision, `Z` suffix. Timestamps are
//! stored as TEXT in that form, so it also sorts correctly.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Format a timestamp as `YYYY-MM-DDTHH:MM:SS.sssZ`.
#[inline]
pub fn format_date(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time in canonical form.
#[inline]
pub fn now_iso() -> String {
    format_date(Utc::now())
}

/// Format an optional timestamp, keeping `None` as `None`.
#[inline]
pub fn format_nullable_date(date: Option<DateTime<Utc>>) -> Option<String> {
    date.map(format_date)
}

/// Parse RFC 3339 text, falling back to SQLite's `YYYY-MM-DD HH:MM:SS`.
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}

/// Re-format a timestamp string into canonical form.
pub fn format_date_str(s: &str) -> Option<String> {
    parse_date(s).map(format_date)
}
