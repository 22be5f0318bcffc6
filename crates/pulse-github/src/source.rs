//! The [`RepositorySource`] seam between the sync orchestrator and the upstream API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use pulse_core::{Branch, Commit, Gist, Repository};

use crate::errors::Result;

/// Hard stop for one paginated listing (a branch log, the repository list,
/// the gist list). A well-behaved upstream ends with an empty page long
/// before this; a misbehaving one that never does is cut off here.
pub const MAX_PAGES: u32 = 1_000;

/// Read access to an account's repositories and their commit logs.
#[async_trait]
pub trait RepositorySource: Send + Sync {
    /// Repositories of the configured account with `pushed_at >= since`.
    async fn list_repositories(&self, since: DateTime<Utc>) -> Result<Vec<Repository>>;

    /// Every branch of `owner/repo`.
    async fn list_branches(&self, owner: &str, repo: &str) -> Result<Vec<Branch>>;

    /// One page (1-based) of the commit log of `branch` since `since`.
    async fn list_commit_page(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        since: DateTime<Utc>,
        page: u32,
    ) -> Result<Vec<Commit>>;

    /// All commits since `since` across every branch of `owner/repo`.
    ///
    /// Pages are requested until one comes back empty. Commits reachable
    /// from several branches appear once per branch; callers rely on
    /// upsert-by-sha to collapse them.
    async fn list_commits(
        &self,
        owner: &str,
        repo: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Commit>> {
        let branches = self.list_branches(owner, repo).await?;
        let mut all = Vec::new();

        for branch in &branches {
            debug!(
                repo = %format!("{owner}/{repo}"),
                branch = %branch.name,
                "fetching commits for branch"
            );
            let mut page = 1;
            loop {
                let batch = self
                    .list_commit_page(owner, repo, &branch.name, since, page)
                    .await?;
                if batch.is_empty() {
                    break;
                }
                all.extend(batch);
                if page >= MAX_PAGES {
                    warn!(
                        repo = %format!("{owner}/{repo}"),
                        branch = %branch.name,
                        pages = page,
                        "page limit reached, stopping branch listing"
                    );
                    break;
                }
                page += 1;
            }
        }

        debug!(
            repo = %format!("{owner}/{repo}"),
            branches = branches.len(),
            commits = all.len(),
            %since,
            "collected commits"
        );
        Ok(all)
    }
}

/// Read access to an account's gists.
#[async_trait]
pub trait GistSource: Send + Sync {
    /// Gists of the configured account with `updated_at >= since`.
    async fn list_gists(&self, since: DateTime<Utc>) -> Result<Vec<Gist>>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
