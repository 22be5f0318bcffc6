//! The `reqwest`-backed [`RepositorySource`] for the GitHub REST API.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use pulse_core::{Branch, Commit, Gist, Repository};
use pulse_settings::GithubSettings;

use crate::errors::{GithubError, Result};
use crate::source::{GistSource, MAX_PAGES, RepositorySource};
use crate::types::{BranchPayload, CommitPayload, GistPayload, RepoPayload};

/// Media type for the v3 REST API.
const GITHUB_V3_JSON: &str = "application/vnd.github.v3+json";

/// Below this many remaining requests the rate-limit budget is logged.
const RATE_LIMIT_LOG_THRESHOLD: u64 = 100;

/// Client for the GitHub REST API.
///
/// Cheap to clone; the underlying `reqwest::Client` shares its pool.
#[derive(Clone, Debug)]
pub struct GithubClient {
    http: reqwest::Client,
    base_url: String,
    per_page: u32,
}

impl GithubClient {
    /// Build a client from settings.
    ///
    /// The token is optional so local runs against public data work; most
    /// deployments set `GITHUB_TOKEN`.
    pub fn new(settings: &GithubSettings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_V3_JSON));
        let _ = headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&settings.user_agent)
                .map_err(|e| GithubError::Config(format!("user agent: {e}")))?,
        );
        if let Some(token) = &settings.token {
            let mut value = HeaderValue::from_str(&format!("token {token}"))
                .map_err(|e| GithubError::Config(format!("token: {e}")))?;
            value.set_sensitive(true);
            let _ = headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(settings.request_timeout_ms))
            .build()?;

        Ok(Self {
            http,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            per_page: settings.per_page,
        })
    }

    /// API root this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        context: &str,
    ) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        let response = self.http.get(&url).query(query).send().await?;

        log_rate_limit(response.headers());

        let status = response.status();
        if !status.is_success() {
            return Err(GithubError::Upstream {
                status: status.as_u16(),
                url,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| GithubError::schema(context, e.to_string()))
    }

    /// Every page of a list endpoint, requested until one comes back empty.
    async fn get_all_pages<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        context: &str,
    ) -> Result<Vec<T>> {
        let mut all = Vec::new();
        for page in 1..=MAX_PAGES {
            let mut paged = query.to_vec();
            paged.push(("per_page", self.per_page.to_string()));
            paged.push(("page", page.to_string()));

            let batch: Vec<T> = self.get_json(path, &paged, context).await?;
            if batch.is_empty() {
                return Ok(all);
            }
            all.extend(batch);
        }
        warn!(path, pages = MAX_PAGES, "page limit reached, stopping listing");
        Ok(all)
    }
}

#[async_trait]
impl RepositorySource for GithubClient {
    #[instrument(skip_all, fields(since = %since))]
    async fn list_repositories(&self, since: DateTime<Utc>) -> Result<Vec<Repository>> {
        let payloads: Vec<RepoPayload> = self
            .get_all_pages("/user/repos", &[], "repositories")
            .await?;
        let total = payloads.len();

        let mut repos = Vec::with_capacity(total);
        for payload in payloads {
            if let Some(repo) = payload.into_repository()? {
                if repo.pushed_at >= since {
                    repos.push(repo);
                }
            }
        }

        debug!(total, kept = repos.len(), "listed repositories");
        Ok(repos)
    }

    #[instrument(skip_all, fields(repo = %format!("{owner}/{repo}")))]
    async fn list_branches(&self, owner: &str, repo: &str) -> Result<Vec<Branch>> {
        let context = format!("branches of {owner}/{repo}");
        let payloads: Vec<BranchPayload> = self
            .get_json(&format!("/repos/{owner}/{repo}/branches"), &[], &context)
            .await?;
        payloads.into_iter().map(Branch::try_from).collect()
    }

    #[instrument(
        skip_all,
        fields(repo = %format!("{owner}/{repo}"), branch = %branch, page = page)
    )]
    async fn list_commit_page(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        since: DateTime<Utc>,
        page: u32,
    ) -> Result<Vec<Commit>> {
        let context = format!("commits of {owner}/{repo}@{branch}");
        let query = [
            ("sha", branch.to_string()),
            ("since", since.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("per_page", self.per_page.to_string()),
            ("page", page.to_string()),
        ];
        let payloads: Vec<CommitPayload> = self
            .get_json(&format!("/repos/{owner}/{repo}/commits"), &query, &context)
            .await?;
        payloads.into_iter().map(Commit::try_from).collect()
    }
}

#[async_trait]
impl GistSource for GithubClient {
    #[instrument(skip_all, fields(since = %since))]
    async fn list_gists(&self, since: DateTime<Utc>) -> Result<Vec<Gist>> {
        let query = [("since", since.to_rfc3339_opts(SecondsFormat::Secs, true))];
        let payloads: Vec<GistPayload> = self.get_all_pages("/gists", &query, "gists").await?;
        let total = payloads.len();

        let mut gists = Vec::with_capacity(total);
        for payload in payloads {
            let gist = Gist::try_from(payload)?;
            if gist.updated_at >= since {
                gists.push(gist);
            }
        }

        debug!(total, kept = gists.len(), "listed gists");
        Ok(gists)
    }
}

fn log_rate_limit(headers: &HeaderMap) {
    let remaining = headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if let Some(remaining) = remaining {
        if remaining < RATE_LIMIT_LOG_THRESHOLD {
            let reset = headers
                .get("x-ratelimit-reset")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            debug!(remaining, reset, "github rate limit running low");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
