//! Outcome types returned by sync passes.

use chrono::{DateTime, Utc};
use pulse_github::GithubError;
use serde::Serialize;

/// Which upstream call failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureStage {
    /// Listing the account's repositories.
    ListRepositories,
    /// Listing branches or commits of one repository.
    ListCommits,
}

/// An upstream failure that was skipped rather than aborting the pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamFailure {
    /// Which call failed.
    pub stage: FailureStage,
    /// Affected repository, when the failure is per repository.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    /// Error category (`upstream`, `schema`, `transport`, `config`).
    pub kind: String,
    /// Human-readable error.
    pub message: String,
}

impl UpstreamFailure {
    pub(crate) fn new(stage: FailureStage, repository: Option<&str>, err: &GithubError) -> Self {
        Self {
            stage,
            repository: repository.map(String::from),
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Summary of one completed sync pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Correlates log lines of this pass.
    pub run_id: String,
    /// Pass start; the sync cursor is advanced to this instant.
    pub started_at: DateTime<Utc>,
    /// Pass end.
    pub finished_at: DateTime<Utc>,
    /// Lookback window in days.
    pub lookback_days: u32,
    /// Window start (`started_at - lookback_days`).
    pub since: DateTime<Utc>,
    /// Repositories upserted.
    pub repositories: usize,
    /// Commits returned upstream, before the author filter.
    pub commits_fetched: usize,
    /// Commits upserted after the author filter.
    pub commits_stored: usize,
    /// Upstream calls that failed and were skipped.
    pub upstream_failures: Vec<UpstreamFailure>,
    /// Sync cursor after the pass.
    pub cursor: DateTime<Utc>,
}

impl SyncReport {
    /// Whether every upstream call succeeded.
    pub fn is_clean(&self) -> bool {
        self.upstream_failures.is_empty()
    }
}

/// Result of a check-and-update call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SyncOutcome {
    /// Data was fresh; nothing was fetched.
    #[serde(rename_all = "camelCase")]
    Fresh {
        /// Age of the freshness basis in seconds.
        age_seconds: i64,
    },
    /// A pass ran.
    Synced(SyncReport),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn report() -> SyncReport {
        let t = Utc.with_ymd_and_hms(2025, 1, 8, 0, 0, 0).unwrap();
        SyncReport {
            run_id: "r1".into(),
            started_at: t,
            finished_at: t,
            lookback_days: 7,
            since: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            repositories: 2,
            commits_fetched: 10,
            commits_stored: 4,
            upstream_failures: vec![],
            cursor: t,
        }
    }

    #[test]
    fn report_serializes_camel_case() {
        let json = serde_json::to_value(report()).unwrap();
        assert_eq!(json["commitsStored"], 4);
        assert_eq!(json["lookbackDays"], 7);
        assert!(json["upstreamFailures"].as_array().unwrap().is_empty());
    }

    #[test]
    fn failure_records_kind_and_repository() {
        let err = GithubError::Upstream {
            status: 404,
            url: "https://api.github.com/repos/o/r/branches".into(),
        };
        let f = UpstreamFailure::new(FailureStage::ListCommits, Some("o/r"), &err);
        assert_eq!(f.kind, "upstream");
        assert_eq!(f.repository.as_deref(), Some("o/r"));

        let mut r = report();
        assert!(r.is_clean());
        r.upstream_failures.push(f);
        assert!(!r.is_clean());
    }

    #[test]
    fn outcome_is_tagged() {
        let fresh = serde_json::to_value(SyncOutcome::Fresh { age_seconds: 60 }).unwrap();
        assert_eq!(fresh["status"], "fresh");
        assert_eq!(fresh["ageSeconds"], 60);

        let synced = serde_json::to_value(SyncOutcome::Synced(report())).unwrap();
        assert_eq!(synced["status"], "synced");
        assert_eq!(synced["runId"], "r1");
    }
}
