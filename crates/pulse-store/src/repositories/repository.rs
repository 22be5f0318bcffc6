//! Repository repo: CRUD for the `repositories` table.
//!
//! Rows are keyed by the upstream id, so renames update in place. The owner
//! is not stored; it is the first segment of `full_name`.

use chrono::{DateTime, Utc};
use pulse_core::Repository;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::{fmt_ts, parse_ts};
use crate::errors::Result;

const COLUMNS: &str = "id, name, full_name, html_url, updated_at, pushed_at";

/// Repository repo. Stateless, every method takes `&Connection`.
pub struct RepositoryRepo;

impl RepositoryRepo {
    /// Insert or update a repository by id. Returns the id.
    pub fn upsert(conn: &Connection, repo: &Repository) -> Result<i64> {
        let _ = conn.execute(
            "INSERT INTO repositories (id, name, full_name, html_url, updated_at, pushed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
               name = excluded.name,
               full_name = excluded.full_name,
               html_url = excluded.html_url,
               updated_at = excluded.updated_at,
               pushed_at = excluded.pushed_at",
            params![
                repo.id,
                repo.name,
                repo.full_name,
                repo.html_url,
                fmt_ts(&repo.updated_at),
                fmt_ts(&repo.pushed_at),
            ],
        )?;
        Ok(repo.id)
    }

    /// Get a repository by id.
    pub fn get(conn: &Connection, id: i64) -> Result<Option<Repository>> {
        let row = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM repositories WHERE id = ?1"),
                params![id],
                map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Number of stored repositories.
    pub fn count(conn: &Connection) -> Result<u64> {
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM repositories", [], |row| row.get(0))?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    /// Repositories pushed at or after `since`, ordered by name.
    pub fn list_pushed_since(conn: &Connection, since: &DateTime<Utc>) -> Result<Vec<Repository>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM repositories
             WHERE pushed_at >= ?1
             ORDER BY name COLLATE NOCASE"
        ))?;
        let rows = stmt
            .query_map(params![fmt_ts(since)], map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<Repository> {
    let full_name: String = row.get(2)?;
    let owner = full_name
        .split_once('/')
        .map_or_else(String::new, |(owner, _)| owner.to_string());
    Ok(Repository {
        id: row.get(0)?,
        name: row.get(1)?,
        full_name,
        owner,
        html_url: row.get(3)?,
        updated_at: parse_ts(&row.get::<_, String>(4)?, 4)?,
        pushed_at: parse_ts(&row.get::<_, String>(5)?, 5)?,
    })
}
