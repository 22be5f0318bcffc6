//! Metric names recorded by sync passes.

/// Sync passes total (counter, labels: trigger, outcome).
pub const SYNC_PASSES_TOTAL: &str = "sync_passes_total";
/// Freshness checks that skipped a pass (counter).
pub const SYNC_SKIPPED_FRESH_TOTAL: &str = "sync_skipped_fresh_total";
/// Upstream failures skipped during a pass (counter, labels: stage, kind).
pub const SYNC_UPSTREAM_FAILURES_TOTAL: &str = "sync_upstream_failures_total";
/// Repositories upserted (counter).
pub const SYNC_REPOSITORIES_UPSERTED_TOTAL: &str = "sync_repositories_upserted_total";
/// Commits upserted (counter).
pub const SYNC_COMMITS_UPSERTED_TOTAL: &str = "sync_commits_upserted_total";
/// Sync pass duration seconds (histogram).
pub const SYNC_PASS_DURATION_SECONDS: &str = "sync_pass_duration_seconds";
