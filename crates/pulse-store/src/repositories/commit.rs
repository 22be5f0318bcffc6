//! Commit repo: CRUD for the `commits` table.

use chrono::{DateTime, Utc};
use pulse_core::Commit;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::{fmt_ts, parse_ts};
use crate::errors::Result;

/// Commit repo. Stateless, every method takes `&Connection`.
pub struct CommitRepo;

impl CommitRepo {
    /// Insert or update a commit by SHA, linking it to `repo_id`.
    ///
    /// Fails with a foreign-key error if `repo_id` is not stored.
    pub fn upsert(conn: &Connection, repo_id: i64, commit: &Commit) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO commits
               (commit_id, author_name, author_username, author_email, author_date, message, html_url, repo_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(commit_id) DO UPDATE SET
               author_name = excluded.author_name,
               author_username = excluded.author_username,
               author_email = excluded.author_email,
               author_date = excluded.author_date,
               message = excluded.message,
               html_url = excluded.html_url,
               repo_id = excluded.repo_id",
            params![
                commit.commit_id,
                commit.author_name,
                commit.author_username,
                commit.author_email,
                fmt_ts(&commit.author_date),
                commit.message,
                commit.html_url,
                repo_id,
            ],
        )?;
        Ok(())
    }

    /// Most recent `author_date` across all stored commits.
    pub fn latest_author_date(conn: &Connection) -> Result<Option<DateTime<Utc>>> {
        let raw: Option<String> = conn
            .query_row("SELECT MAX(author_date) FROM commits", [], |row| row.get(0))
            .optional()?
            .flatten();
        raw.map(|s| parse_ts(&s, 0).map_err(Into::into)).transpose()
    }

    /// Number of stored commits.
    pub fn count(conn: &Connection) -> Result<u64> {
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM commits", [], |row| row.get(0))?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    /// Commits of one repository authored at or after `since`, newest first.
    pub fn list_for_repo_since(
        conn: &Connection,
        repo_id: i64,
        since: &DateTime<Utc>,
    ) -> Result<Vec<Commit>> {
        let mut stmt = conn.prepare(
            "SELECT commit_id, author_name, author_username, author_email, author_date, message, html_url
             FROM commits
             WHERE repo_id = ?1 AND author_date >= ?2
             ORDER BY author_date DESC, commit_id",
        )?;
        let rows = stmt
            .query_map(params![repo_id, fmt_ts(since)], map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<Commit> {
    Ok(Commit {
        commit_id: row.get(0)?,
        author_name: row.get(1)?,
        author_username: row.get(2)?,
        author_email: row.get(3)?,
        author_date: parse_ts(&row.get::<_, String>(4)?, 4)?,
        message: row.get(5)?,
        html_url: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StoreError;
    use crate::migrations::run_migrations;
    use crate::repositories::repository::RepositoryRepo;
    use assert_matches::assert_matches;
    use chrono::TimeZone;
    use pulse_core::Repository;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        let _ = run_migrations(&conn).unwrap();
        let _ = RepositoryRepo::upsert(
            &conn,
            &Repository {
                id: 1,
                name: "pulse".into(),
                full_name: "davehague/pulse".into(),
                owner: "davehague".into(),
                html_url: "https://github.com/davehague/pulse".into(),
                updated_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
                pushed_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            },
        )
        .unwrap();
        conn
    }

    fn commit(sha: &str, day: u32) -> Commit {
        Commit {
            commit_id: sha.into(),
            author_name: "Dave".into(),
            author_email: "david.hague@gmail.com".into(),
            author_username: Some("davehague".into()),
            author_date: Utc.with_ymd_and_hms(2025, 1, day, 9, 0, 0).unwrap(),
            message: format!("commit {sha}"),
            html_url: format!("https://github.com/davehague/pulse/commit/{sha}"),
        }
    }

    #[test]
    fn upsert_is_idempotent() {
        let conn = setup();
        let c = commit("abc", 2);
        CommitRepo::upsert(&conn, 1, &c).unwrap();
        CommitRepo::upsert(&conn, 1, &c).unwrap();
        assert_eq!(CommitRepo::count(&conn).unwrap(), 1);
    }

    #[test]
    fn upsert_overwrites_fields() {
        let conn = setup();
        CommitRepo::upsert(&conn, 1, &commit("abc", 2)).unwrap();
        let mut amended = commit("abc", 2);
        amended.message = "reworded".into();
        CommitRepo::upsert(&conn, 1, &amended).unwrap();

        let since = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let stored = CommitRepo::list_for_repo_since(&conn, 1, &since).unwrap();
        assert_eq!(stored, vec![amended]);
    }

    #[test]
    fn unknown_repo_violates_foreign_key() {
        let conn = setup();
        let err = CommitRepo::upsert(&conn, 99, &commit("abc", 2)).unwrap_err();
        assert_matches!(err, StoreError::Sqlite(_));
    }

    #[test]
    fn latest_author_date_empty_is_none() {
        let conn = setup();
        assert!(CommitRepo::latest_author_date(&conn).unwrap().is_none());
    }

    #[test]
    fn latest_author_date_picks_max() {
        let conn = setup();
        CommitRepo::upsert(&conn, 1, &commit("a", 3)).unwrap();
        CommitRepo::upsert(&conn, 1, &commit("b", 9)).unwrap();
        CommitRepo::upsert(&conn, 1, &commit("c", 5)).unwrap();
        assert_eq!(
            CommitRepo::latest_author_date(&conn).unwrap(),
            Some(Utc.with_ymd_and_hms(2025, 1, 9, 9, 0, 0).unwrap())
        );
    }

    #[test]
    fn list_for_repo_since_is_newest_first() {
        let conn = setup();
        CommitRepo::upsert(&conn, 1, &commit("a", 3)).unwrap();
        CommitRepo::upsert(&conn, 1, &commit("b", 9)).unwrap();
        CommitRepo::upsert(&conn, 1, &commit("c", 5)).unwrap();

        let since = Utc.with_ymd_and_hms(2025, 1, 4, 0, 0, 0).unwrap();
        let shas: Vec<_> = CommitRepo::list_for_repo_since(&conn, 1, &since)
            .unwrap()
            .into_iter()
            .map(|c| c.commit_id)
            .collect();
        assert_eq!(shas, vec!["b", "c"]);
    }
}
