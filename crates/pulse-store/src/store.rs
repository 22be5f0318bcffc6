//! Store traits and the `SQLite` implementation.
//!
//! [`SyncStore`] is the write side the sync orchestrator depends on.
//! [`DashboardStore`] is the read side behind the projects and status
//! endpoints. [`SqliteStore`] implements both over an r2d2 pool.

use chrono::{DateTime, Utc};
use pulse_core::{Commit, Project, Repository};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::connection::{self, ConnectionConfig, ConnectionPool, PooledConnection};
use crate::errors::Result;
use crate::migrations;
use crate::repositories::commit::CommitRepo;
use crate::repositories::repository::RepositoryRepo;
use crate::repositories::sync_state::SyncStateRepo;

/// Write-side operations used during a sync run.
///
/// All upserts are idempotent: repeating one with the same record leaves
/// the store unchanged.
pub trait SyncStore: Send + Sync {
    /// Insert or update a repository. Returns its id.
    fn upsert_repository(&self, repo: &Repository) -> Result<i64>;

    /// Insert or update a commit belonging to `repo_id`.
    fn upsert_commit(&self, repo_id: i64, commit: &Commit) -> Result<()>;

    /// Most recent stored commit author date.
    fn latest_commit_date(&self) -> Result<Option<DateTime<Utc>>>;

    /// Current sync cursor.
    fn sync_cursor(&self) -> Result<Option<DateTime<Utc>>>;

    /// Advance the sync cursor to `at`. Never moves it backwards.
    /// Returns the stored cursor after the write.
    fn advance_sync_cursor(&self, at: DateTime<Utc>) -> Result<DateTime<Utc>>;
}

/// Aggregate counters for the status endpoint and CLI.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    /// Stored repositories.
    pub repositories: u64,
    /// Stored commits.
    pub commits: u64,
    /// Sync cursor.
    pub last_synced_at: Option<DateTime<Utc>>,
    /// Newest stored commit author date.
    pub latest_commit_at: Option<DateTime<Utc>>,
}

/// Read-side operations for the dashboard.
pub trait DashboardStore: Send + Sync {
    /// Repositories pushed at or after `since`, each with its commits
    /// authored at or after `since` (newest first). Ordered by name.
    fn projects_since(&self, since: DateTime<Utc>) -> Result<Vec<Project>>;

    /// Aggregate counters.
    fn stats(&self) -> Result<StoreStats>;
}

/// `SQLite`-backed store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: ConnectionPool,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("max_size", &self.pool.max_size())
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (or create) a database file and bring its schema up to date.
    pub fn open(path: &str, config: &ConnectionConfig) -> Result<Self> {
        Self::from_pool(connection::new_file(path, config)?)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_pool(connection::new_in_memory(&ConnectionConfig::default())?)
    }

    fn from_pool(pool: ConnectionPool) -> Result<Self> {
        let conn = pool.get()?;
        let applied = migrations::run_migrations(&conn)?;
        debug!(applied, "store schema ready");
        drop(conn);
        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection> {
        Ok(self.pool.get()?)
    }
}

impl SyncStore for SqliteStore {
    fn upsert_repository(&self, repo: &Repository) -> Result<i64> {
        RepositoryRepo::upsert(&*self.conn()?, repo)
    }

    fn upsert_commit(&self, repo_id: i64, commit: &Commit) -> Result<()> {
        CommitRepo::upsert(&*self.conn()?, repo_id, commit)
    }

    fn latest_commit_date(&self) -> Result<Option<DateTime<Utc>>> {
        CommitRepo::latest_author_date(&*self.conn()?)
    }

    fn sync_cursor(&self) -> Result<Option<DateTime<Utc>>> {
        SyncStateRepo::get(&*self.conn()?)
    }

    fn advance_sync_cursor(&self, at: DateTime<Utc>) -> Result<DateTime<Utc>> {
        SyncStateRepo::advance(&*self.conn()?, &at)
    }
}

impl DashboardStore for SqliteStore {
    #[instrument(skip(self), fields(since = %since))]
    fn projects_since(&self, since: DateTime<Utc>) -> Result<Vec<Project>> {
        let conn = self.conn()?;
        RepositoryRepo::list_pushed_since(&conn, &since)?
            .into_iter()
            .map(|repository| {
                let all_commits = CommitRepo::list_for_repo_since(&conn, repository.id, &since)?;
                Ok(Project {
                    repository,
                    all_commits,
                })
            })
            .collect()
    }

    fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn()?;
        Ok(StoreStats {
            repositories: RepositoryRepo::count(&conn)?,
            commits: CommitRepo::count(&conn)?,
            last_synced_at: SyncStateRepo::get(&conn)?,
            latest_commit_at: CommitRepo::latest_author_date(&conn)?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
