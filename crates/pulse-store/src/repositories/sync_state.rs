//! Sync cursor: the single-row `sync_state` table.
//!
//! The cursor only moves forward. An advance to an earlier instant leaves
//! the stored value untouched.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use super::{fmt_ts, parse_ts};
use crate::errors::Result;

/// Sync cursor repo. Stateless, every method takes `&Connection`.
pub struct SyncStateRepo;

impl SyncStateRepo {
    /// Current cursor, if any sync has completed.
    pub fn get(conn: &Connection) -> Result<Option<DateTime<Utc>>> {
        let raw: Option<String> = conn
            .query_row("SELECT last_synced_at FROM sync_state WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        raw.map(|s| parse_ts(&s, 0).map_err(Into::into)).transpose()
    }

    /// Move the cursor to `at` unless it is already later. Returns the
    /// stored value after the write.
    pub fn advance(conn: &Connection, at: &DateTime<Utc>) -> Result<DateTime<Utc>> {
        let _ = conn.execute(
            "INSERT INTO sync_state (id, last_synced_at) VALUES (1, ?1)
             ON CONFLICT(id) DO UPDATE SET
               last_synced_at = MAX(last_synced_at, excluded.last_synced_at)",
            params![fmt_ts(at)],
        )?;
        let raw: String = conn.query_row(
            "SELECT last_synced_at FROM sync_state WHERE id = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(parse_ts(&raw, 0)?)
    }
}
