//! Wire-format payloads and their conversion into core records.
//!
//! Only the fields pulse uses are declared; unknown fields are ignored.
//! Missing or mistyped required fields fail decoding, and the semantic
//! checks in the `TryFrom` impls reject values that decode but make no sense.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use pulse_core::{Branch, Commit, Gist, GistFile, Repository};

use crate::errors::{GithubError, Result};

/// One entry of `GET /user/repos`.
#[derive(Debug, Deserialize)]
pub struct RepoPayload {
    /// Numeric repository id.
    pub id: i64,
    /// Short name.
    pub name: String,
    /// `owner/name`.
    pub full_name: String,
    /// Web URL.
    pub html_url: String,
    /// Last metadata update.
    pub updated_at: DateTime<Utc>,
    /// Last push. `null` for repositories that were never pushed to.
    pub pushed_at: Option<DateTime<Utc>>,
}

/// One entry of `GET /repos/{owner}/{repo}/branches`.
#[derive(Debug, Deserialize)]
pub struct BranchPayload {
    /// Branch name.
    pub name: String,
}

/// One entry of `GET /repos/{owner}/{repo}/commits`.
#[derive(Debug, Deserialize)]
pub struct CommitPayload {
    /// Commit SHA.
    pub sha: String,
    /// Web URL.
    pub html_url: String,
    /// Git-level metadata.
    pub commit: GitCommitPayload,
    /// Linked account, absent when the email is not tied to one.
    pub author: Option<AccountPayload>,
}

/// The `commit` object nested inside a [`CommitPayload`].
#[derive(Debug, Deserialize)]
pub struct GitCommitPayload {
    /// Git author signature.
    pub author: GitSignaturePayload,
    /// Commit message.
    pub message: String,
}

/// A git signature (name, email, timestamp).
#[derive(Debug, Deserialize)]
pub struct GitSignaturePayload {
    /// Author name.
    pub name: String,
    /// Author email.
    pub email: String,
    /// Author timestamp.
    pub date: DateTime<Utc>,
}

/// A linked upstream account.
#[derive(Debug, Deserialize)]
pub struct AccountPayload {
    /// Account login.
    pub login: String,
}

/// One entry of `GET /gists`.
#[derive(Debug, Deserialize)]
pub struct GistPayload {
    /// Gist id.
    pub id: String,
    /// Description, `null` when unset.
    pub description: Option<String>,
    /// Web URL.
    pub html_url: String,
    /// Public or secret.
    pub public: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last edit.
    pub updated_at: DateTime<Utc>,
    /// Files keyed by name.
    #[serde(default)]
    pub files: BTreeMap<String, GistFilePayload>,
}

/// A file entry inside a [`GistPayload`].
#[derive(Debug, Deserialize)]
pub struct GistFilePayload {
    /// File name.
    pub filename: String,
    /// Detected language.
    pub language: Option<String>,
}

impl RepoPayload {
    /// Convert into a [`Repository`], or `Ok(None)` if it was never pushed.
    pub fn into_repository(self) -> Result<Option<Repository>> {
        let Some(pushed_at) = self.pushed_at else {
            return Ok(None);
        };
        let owner = match self.full_name.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() => owner.to_string(),
            _ => {
                return Err(GithubError::schema(
                    "repositories",
                    format!("full_name {:?} is not owner/name", self.full_name),
                ));
            }
        };
        Ok(Some(Repository {
            id: self.id,
            name: self.name,
            full_name: self.full_name,
            owner,
            html_url: self.html_url,
            updated_at: self.updated_at,
            pushed_at,
        }))
    }
}

impl TryFrom<BranchPayload> for Branch {
    type Error = GithubError;

    fn try_from(p: BranchPayload) -> Result<Self> {
        if p.name.is_empty() {
            return Err(GithubError::schema("branches", "empty branch name"));
        }
        Ok(Branch { name: p.name })
    }
}

impl TryFrom<CommitPayload> for Commit {
    type Error = GithubError;

    fn try_from(p: CommitPayload) -> Result<Self> {
        if p.sha.is_empty() {
            return Err(GithubError::schema("commits", "empty sha"));
        }
        Ok(Commit {
            commit_id: p.sha,
            author_name: p.commit.author.name,
            author_email: p.commit.author.email,
            author_username: p.author.map(|a| a.login),
            author_date: p.commit.author.date,
            message: p.commit.message,
            html_url: p.html_url,
        })
    }
}

impl TryFrom<GistPayload> for Gist {
    type Error = GithubError;

    fn try_from(p: GistPayload) -> Result<Self> {
        if p.id.is_empty() {
            return Err(GithubError::schema("gists", "empty gist id"));
        }
        let files = p
            .files
            .into_iter()
            .map(|(name, f)| {
                let file = GistFile {
                    filename: f.filename,
                    language: f.language,
                };
                (name, file)
            })
            .collect();
        Ok(Gist {
            id: p.id,
            description: p.description,
            html_url: p.html_url,
            public: p.public,
            created_at: p.created_at,
            updated_at: p.updated_at,
            files,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
