//! The sync orchestrator.
//!
//! A pass lists the account's repositories pushed inside the lookback
//! window, then for each repository (strictly one at a time) upserts the
//! repository, lists its commits across every branch, keeps the configured
//! author's commits, and upserts them. When every store write succeeded the
//! sync cursor is advanced to the pass start time and the `on_synced` hooks
//! run.
//!
//! Upstream failures are logged, counted, recorded in the report, and
//! skipped. Store failures abort the pass and leave the cursor untouched.
//! Rows written before the failure stay written; the next pass upserts them
//! again. Store calls run on the blocking pool.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use pulse_core::retain_authored_by;
use pulse_core::time::lookback_since;
use pulse_github::RepositorySource;
use pulse_settings::{FreshnessBasis, SyncSettings};
use pulse_store::SyncStore;
use tokio::sync::Mutex;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::errors::{Result, SyncError};
use crate::freshness;
use crate::metrics::{
    SYNC_COMMITS_UPSERTED_TOTAL, SYNC_PASS_DURATION_SECONDS, SYNC_PASSES_TOTAL,
    SYNC_REPOSITORIES_UPSERTED_TOTAL, SYNC_SKIPPED_FRESH_TOTAL, SYNC_UPSTREAM_FAILURES_TOTAL,
};
use crate::report::{FailureStage, SyncOutcome, SyncReport, UpstreamFailure};

/// Callback run after a pass that advanced the sync cursor.
pub type SyncHook = Box<dyn Fn(&SyncReport) + Send + Sync>;

/// Runs sync passes against an injected source and store.
///
/// Passes are serialized: a second trigger waits for the running pass to
/// finish before it starts.
pub struct SyncOrchestrator {
    source: Arc<dyn RepositorySource>,
    store: Arc<dyn SyncStore>,
    author_email: String,
    settings: SyncSettings,
    pass_lock: Mutex<()>,
    on_synced: Vec<SyncHook>,
}

impl std::fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("author_email", &self.author_email)
            .field("settings", &self.settings)
            .field("on_synced", &self.on_synced.len())
            .finish_non_exhaustive()
    }
}

impl SyncOrchestrator {
    /// Create an orchestrator.
    pub fn new(
        source: Arc<dyn RepositorySource>,
        store: Arc<dyn SyncStore>,
        author_email: impl Into<String>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            source,
            store,
            author_email: author_email.into(),
            settings,
            pass_lock: Mutex::new(()),
            on_synced: Vec::new(),
        }
    }

    /// Run `hook` after every successful pass, whichever trigger started it.
    ///
    /// Hooks run before the pass lock is released.
    #[must_use]
    pub fn on_synced(mut self, hook: impl Fn(&SyncReport) + Send + Sync + 'static) -> Self {
        self.on_synced.push(Box::new(hook));
        self
    }

    /// Sync settings in effect.
    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Run a full-lookback pass if the mirror is missing or stale.
    pub async fn check_and_update(&self) -> Result<SyncOutcome> {
        self.check_and_update_at(Utc::now()).await
    }

    /// [`check_and_update`](Self::check_and_update) with an explicit clock.
    pub async fn check_and_update_at(&self, now: DateTime<Utc>) -> Result<SyncOutcome> {
        let _guard = self.pass_lock.lock().await;

        let basis_kind = self.settings.freshness_basis;
        let context = "reading freshness basis";
        let basis = self
            .with_store(context, move |store| {
                match basis_kind {
                    FreshnessBasis::LatestCommit => store.latest_commit_date(),
                    FreshnessBasis::SyncCursor => store.sync_cursor(),
                }
                .map_err(SyncError::store(context))
            })
            .await?;

        let stale_after = Duration::hours(i64::from(self.settings.stale_after_hours));
        let state = freshness::assess(now, basis, stale_after);
        if state.needs_sync() {
            info!(freshness = ?state, "mirror missing or stale, running sync");
            return self
                .run_pass("check", self.settings.full_lookback_days, now)
                .await
                .map(SyncOutcome::Synced);
        }

        let age = state.age().unwrap_or_else(Duration::zero);
        info!(age_hours = age.num_hours(), "mirror is fresh, skipping sync");
        metrics::counter!(SYNC_SKIPPED_FRESH_TOTAL).increment(1);
        Ok(SyncOutcome::Fresh {
            age_seconds: age.num_seconds(),
        })
    }

    /// Mirror the last `lookback_days` days.
    pub async fn full_sync(&self, lookback_days: u32) -> Result<SyncReport> {
        self.full_sync_at(lookback_days, Utc::now()).await
    }

    /// [`full_sync`](Self::full_sync) with an explicit clock.
    pub async fn full_sync_at(&self, lookback_days: u32, now: DateTime<Utc>) -> Result<SyncReport> {
        let _guard = self.pass_lock.lock().await;
        self.run_pass("manual", lookback_days, now).await
    }

    /// Short-window pass used by the cron trigger.
    pub async fn incremental_sync(&self) -> Result<SyncReport> {
        let _guard = self.pass_lock.lock().await;
        self.run_pass("incremental", self.settings.incremental_lookback_days, Utc::now())
            .await
    }

    /// Full-window pass used by the admin refresh trigger.
    pub async fn full_resync(&self) -> Result<SyncReport> {
        let _guard = self.pass_lock.lock().await;
        self.run_pass("resync", self.settings.full_lookback_days, Utc::now())
            .await
    }

    async fn run_pass(
        &self,
        trigger: &'static str,
        lookback_days: u32,
        now: DateTime<Utc>,
    ) -> Result<SyncReport> {
        let run_id = Uuid::now_v7().to_string();
        let span = info_span!("sync_pass", run_id = %run_id, trigger, lookback_days);
        let started = Instant::now();

        let result = self
            .mirror(run_id, lookback_days, now)
            .instrument(span)
            .await;

        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(SYNC_PASSES_TOTAL, "trigger" => trigger, "outcome" => outcome)
            .increment(1);
        metrics::histogram!(SYNC_PASS_DURATION_SECONDS).record(started.elapsed().as_secs_f64());

        if let Ok(report) = &result {
            for hook in &self.on_synced {
                hook(report);
            }
        }
        result
    }

    /// Run `f` against the store on the blocking pool.
    async fn with_store<T, F>(&self, context: impl Into<String>, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn SyncStore) -> Result<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        match tokio::task::spawn_blocking(move || f(store.as_ref())).await {
            Ok(result) => result,
            Err(source) => Err(SyncError::Blocking {
                context: context.into(),
                source,
            }),
        }
    }

    async fn mirror(
        &self,
        run_id: String,
        lookback_days: u32,
        started_at: DateTime<Utc>,
    ) -> Result<SyncReport> {
        let since = lookback_since(started_at, lookback_days)
            .ok_or(SyncError::LookbackOutOfRange { days: lookback_days })?;
        info!(%since, "sync pass started");

        let mut failures = Vec::new();
        let repositories = match self.source.list_repositories(since).await {
            Ok(repos) => repos,
            Err(e) => {
                warn!(error = %e, "listing repositories failed, treating as empty");
                let failure = UpstreamFailure::new(FailureStage::ListRepositories, None, &e);
                record_failure(&mut failures, failure);
                Vec::new()
            }
        };

        let mut commits_fetched = 0;
        let mut commits_stored = 0;

        for repo in &repositories {
            let row = repo.clone();
            let context = format!("upserting repository {}", repo.full_name);
            let repo_id = self
                .with_store(context.clone(), move |store| {
                    store.upsert_repository(&row).map_err(SyncError::store(context))
                })
                .await?;
            metrics::counter!(SYNC_REPOSITORIES_UPSERTED_TOTAL).increment(1);

            let commits = match self.source.list_commits(&repo.owner, &repo.name, since).await {
                Ok(commits) => commits,
                Err(e) => {
                    warn!(repo = %repo.full_name, error = %e, "listing commits failed, skipping");
                    let failure =
                        UpstreamFailure::new(FailureStage::ListCommits, Some(&repo.full_name), &e);
                    record_failure(&mut failures, failure);
                    continue;
                }
            };
            commits_fetched += commits.len();

            let authored = retain_authored_by(commits, &self.author_email);
            let stored = authored.len();
            let full_name = repo.full_name.clone();
            self.with_store(format!("upserting commits of {full_name}"), move |store| {
                for commit in &authored {
                    store.upsert_commit(repo_id, commit).map_err(SyncError::store(format!(
                        "upserting commit {} of {full_name}",
                        commit.commit_id
                    )))?;
                }
                Ok(())
            })
            .await?;
            metrics::counter!(SYNC_COMMITS_UPSERTED_TOTAL).increment(stored as u64);
            commits_stored += stored;
            debug!(repo = %repo.full_name, stored, "repository mirrored");
        }

        let context = "advancing sync cursor";
        let cursor = self
            .with_store(context, move |store| {
                store
                    .advance_sync_cursor(started_at)
                    .map_err(SyncError::store(context))
            })
            .await?;

        let report = SyncReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            lookback_days,
            since,
            repositories: repositories.len(),
            commits_fetched,
            commits_stored,
            upstream_failures: failures,
            cursor,
        };
        info!(
            repositories = report.repositories,
            commits_fetched,
            commits_stored,
            upstream_failures = report.upstream_failures.len(),
            "sync pass finished"
        );
        Ok(report)
    }
}

fn record_failure(failures: &mut Vec<UpstreamFailure>, failure: UpstreamFailure) {
    let stage = match failure.stage {
        FailureStage::ListRepositories => "list_repositories",
        FailureStage::ListCommits => "list_commits",
    };
    let kind = failure.kind.clone();
    metrics::counter!(SYNC_UPSTREAM_FAILURES_TOTAL, "stage" => stage, "kind" => kind).increment(1);
    failures.push(failure);
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FailingStore, FakeSource, commit, repo};
    use assert_matches::assert_matches;
    use chrono::TimeZone;
    use pulse_store::{DashboardStore, SqliteStore};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ME: &str = "bob@y.com";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    fn orchestrator(source: Arc<FakeSource>, store: Arc<dyn SyncStore>) -> SyncOrchestrator {
        SyncOrchestrator::new(source, store, ME, SyncSettings::default())
    }

    fn two_repo_source() -> FakeSource {
        FakeSource::new()
            .with_repo(repo(1, "pulse"), vec![
                commit("a1", "alice@x.com", now() - Duration::days(1)),
                commit("b1", ME, now() - Duration::days(1)),
                commit("b2", ME, now() - Duration::days(2)),
            ])
            .with_repo(repo(2, "site"), vec![commit("b3", ME, now() - Duration::days(3))])
    }

    #[tokio::test]
    async fn full_sync_stores_only_authored_commits() {
        let source = Arc::new(FakeSource::new().with_repo(repo(1, "pulse"), vec![
            commit("a1", "alice@x.com", now() - Duration::days(1)),
            commit("b1", ME, now() - Duration::days(1)),
        ]));
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let orch = orchestrator(source, store.clone());

        let report = orch.full_sync_at(7, now()).await.unwrap();
        assert_eq!(report.commits_fetched, 2);
        assert_eq!(report.commits_stored, 1);

        let projects = store.projects_since(now() - Duration::days(7)).unwrap();
        let shas: Vec<_> = projects[0].all_commits.iter().map(|c| c.commit_id.as_str()).collect();
        assert_eq!(shas, vec!["b1"]);
    }

    #[tokio::test]
    async fn repeated_full_sync_keeps_counts_stable() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let orch = orchestrator(Arc::new(two_repo_source()), store.clone());

        let _ = orch.full_sync_at(30, now()).await.unwrap();
        let first = store.stats().unwrap();
        let _ = orch.full_sync_at(30, now() + Duration::minutes(5)).await.unwrap();
        let second = store.stats().unwrap();

        assert_eq!(first.repositories, 2);
        assert_eq!(first.commits, 3);
        assert_eq!(first.repositories, second.repositories);
        assert_eq!(first.commits, second.commits);
    }

    #[tokio::test]
    async fn cursor_advances_to_pass_start() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let orch = orchestrator(Arc::new(two_repo_source()), store.clone());

        let report = orch.full_sync_at(30, now()).await.unwrap();
        assert_eq!(report.cursor, now());
        assert_eq!(report.since, now() - Duration::days(30));
        assert_eq!(store.sync_cursor().unwrap(), Some(now()));
    }

    #[tokio::test]
    async fn store_failure_aborts_and_keeps_cursor() {
        let inner = Arc::new(SqliteStore::open_in_memory().unwrap());
        let earlier = now() - Duration::days(2);
        let _ = inner.advance_sync_cursor(earlier).unwrap();
        let store = Arc::new(FailingStore::new(inner.clone(), "b2"));
        let orch = orchestrator(Arc::new(two_repo_source()), store);

        let err = orch.full_sync_at(30, now()).await.unwrap_err();
        assert_matches!(err, SyncError::Store { .. });
        assert_eq!(inner.sync_cursor().unwrap(), Some(earlier));
    }

    #[tokio::test]
    async fn repository_listing_failure_is_skipped() {
        let source = Arc::new(two_repo_source().failing_repository_listing());
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let orch = orchestrator(source, store.clone());

        let report = orch.full_sync_at(30, now()).await.unwrap();
        assert_eq!(report.repositories, 0);
        assert_eq!(report.upstream_failures.len(), 1);
        assert_eq!(report.upstream_failures[0].stage, FailureStage::ListRepositories);
        assert_eq!(store.sync_cursor().unwrap(), Some(now()));
    }

    #[tokio::test]
    async fn commit_listing_failure_skips_only_that_repository() {
        let source = Arc::new(two_repo_source().failing_commits_for("pulse"));
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let orch = orchestrator(source, store.clone());

        let report = orch.full_sync_at(30, now()).await.unwrap();
        assert_eq!(report.repositories, 2);
        assert_eq!(report.commits_stored, 1);
        assert_eq!(report.upstream_failures.len(), 1);
        assert_eq!(report.upstream_failures[0].repository.as_deref(), Some("davehague/pulse"));

        let stats = store.stats().unwrap();
        assert_eq!(stats.repositories, 2);
        assert_eq!(stats.commits, 1);
    }

    #[tokio::test]
    async fn fresh_data_skips_upstream() {
        let source = Arc::new(two_repo_source());
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let orch = orchestrator(source.clone(), store.clone());

        let id = store.upsert_repository(&repo(1, "pulse")).unwrap();
        store
            .upsert_commit(id, &commit("recent", ME, now() - Duration::hours(6)))
            .unwrap();

        let outcome = orch.check_and_update_at(now()).await.unwrap();
        assert_eq!(outcome, SyncOutcome::Fresh { age_seconds: 6 * 3600 });
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn stale_data_runs_full_lookback() {
        let source = Arc::new(two_repo_source());
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let orch = orchestrator(source.clone(), store.clone());

        let id = store.upsert_repository(&repo(1, "pulse")).unwrap();
        store
            .upsert_commit(id, &commit("old", ME, now() - Duration::days(2)))
            .unwrap();

        let outcome = orch.check_and_update_at(now()).await.unwrap();
        assert_matches!(outcome, SyncOutcome::Synced(ref r) if r.lookback_days == 730);
        assert!(source.calls() > 0);
    }

    #[tokio::test]
    async fn empty_store_runs_initial_sync() {
        let source = Arc::new(two_repo_source());
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let orch = orchestrator(source, store.clone());

        let outcome = orch.check_and_update_at(now()).await.unwrap();
        assert_matches!(outcome, SyncOutcome::Synced(_));
        assert_eq!(store.stats().unwrap().commits, 3);
    }

    #[tokio::test]
    async fn cursor_basis_uses_sync_state() {
        let source = Arc::new(two_repo_source());
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let settings = SyncSettings {
            freshness_basis: FreshnessBasis::SyncCursor,
            ..SyncSettings::default()
        };
        let orch = SyncOrchestrator::new(source.clone(), store.clone(), ME, settings);

        let _ = store.advance_sync_cursor(now() - Duration::hours(1)).unwrap();
        let outcome = orch.check_and_update_at(now()).await.unwrap();
        assert_matches!(outcome, SyncOutcome::Fresh { .. });
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn hooks_run_after_successful_pass_only() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let inner = Arc::new(SqliteStore::open_in_memory().unwrap());
        let failing = Arc::new(FailingStore::new(inner.clone(), "b2"));

        let broken = orchestrator(Arc::new(two_repo_source()), failing).on_synced({
            let counter = counter.clone();
            move |_| {
                let _ = counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        assert!(broken.full_sync_at(30, now()).await.is_err());
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        let healthy = orchestrator(Arc::new(two_repo_source()), inner).on_synced(move |report| {
            assert_eq!(report.commits_stored, 3);
            let _ = counter.fetch_add(1, Ordering::SeqCst);
        });
        let _ = healthy.full_sync_at(30, now()).await.unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fresh_check_skips_hooks() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let id = store.upsert_repository(&repo(1, "pulse")).unwrap();
        store
            .upsert_commit(id, &commit("recent", ME, now() - Duration::hours(1)))
            .unwrap();
        let orch = orchestrator(Arc::new(two_repo_source()), store).on_synced(move |_| {
            let _ = counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_matches!(orch.check_and_update_at(now()).await.unwrap(), SyncOutcome::Fresh { .. });
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn out_of_range_lookback_is_an_error() {
        let source = Arc::new(two_repo_source());
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let orch = orchestrator(source.clone(), store.clone());

        let err = orch.full_sync_at(u32::MAX, now()).await.unwrap_err();
        assert_matches!(err, SyncError::LookbackOutOfRange { days: u32::MAX });
        assert_eq!(source.calls(), 0);
        assert!(store.sync_cursor().unwrap().is_none());
    }
}
