//! Repository implementations for `SQLite` database operations.
//!
//! Each repository is a stateless struct whose methods take a `&Connection`
//! parameter, so every operation is a plain function of (connection, input).
//!
//! Timestamps are stored as fixed-width RFC 3339 text (millisecond precision,
//! `Z` suffix) so lexical order in SQL matches chronological order.

pub mod commit;
pub mod repository;
pub mod sync_state;

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a timestamp for storage.
pub(crate) fn fmt_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp from column `idx`.
pub(crate) fn parse_ts(raw: &str, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}
