//! Domain records mirrored from the upstream commit host.
//!
//! These are the validated shapes that flow between the GitHub client, the
//! sync orchestrator, and the store. Raw upstream JSON never leaves
//! `pulse-github`; it is converted into these records at the boundary.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A repository owned by (or visible to) the configured account.
///
/// Identity is the upstream numeric `id`, which is stable across renames.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Upstream repository id.
    pub id: i64,
    /// Short name (`pulse`).
    pub name: String,
    /// Owner-qualified name (`davehague/pulse`).
    pub full_name: String,
    /// Owning account login, taken from the first segment of `full_name`.
    pub owner: String,
    /// Canonical web URL.
    pub html_url: String,
    /// Last metadata update.
    pub updated_at: DateTime<Utc>,
    /// Last push to any branch.
    pub pushed_at: DateTime<Utc>,
}

/// A branch name as listed by the upstream API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// Branch name, e.g. `main`.
    pub name: String,
}

/// A single commit authored on some branch of a repository.
///
/// Identity is `commit_id` (the content hash), unique across repositories.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Commit SHA.
    pub commit_id: String,
    /// Author name from the git metadata.
    pub author_name: String,
    /// Author email from the git metadata.
    pub author_email: String,
    /// Upstream account login, when the author email maps to one.
    pub author_username: Option<String>,
    /// Author timestamp.
    pub author_date: DateTime<Utc>,
    /// Full commit message.
    pub message: String,
    /// Canonical web URL of the commit.
    pub html_url: String,
}

/// Dashboard read model: a repository together with its recent commits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// The repository.
    #[serde(flatten)]
    pub repository: Repository,
    /// Commits in the requested window, newest first.
    pub all_commits: Vec<Commit>,
}

/// A gist of the configured account. Read live, never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gist {
    /// Upstream gist id.
    pub id: String,
    /// Free-text description, often absent.
    pub description: Option<String>,
    /// Web URL.
    pub html_url: String,
    /// Listed publicly.
    pub public: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last edit.
    pub updated_at: DateTime<Utc>,
    /// Files keyed by file name.
    pub files: BTreeMap<String, GistFile>,
}

/// One file of a [`Gist`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GistFile {
    /// File name.
    pub filename: String,
    /// Detected language.
    pub language: Option<String>,
}

/// Keep only commits whose author email equals `email` exactly.
///
/// Pulse tracks one person's authored work, not full repository history.
pub fn retain_authored_by(commits: Vec<Commit>, email: &str) -> Vec<Commit> {
    commits
        .into_iter()
        .filter(|c| c.author_email == email)
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
