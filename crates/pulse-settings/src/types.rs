//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` for the JSON file
//! format. Each type implements [`Default`] with production values, and
//! `#[serde(default)]` lets a settings file specify only what it changes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Upstream API page size ceiling.
pub const MAX_PER_PAGE: u32 = 100;

/// Longest accepted lookback window, in days.
pub const MAX_LOOKBACK_DAYS: u32 = 36_500;

/// Root settings type.
///
/// # JSON Format
///
/// ```json
/// {
///   "server": { "port": 3000 },
///   "github": { "authorEmail": "me@example.com" },
///   "sync": { "incrementalLookbackDays": 14 }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PulseSettings {
    /// HTTP listener.
    pub server: ServerSettings,
    /// Upstream GitHub API access.
    pub github: GithubSettings,
    /// Sync windows, freshness, and schedule.
    pub sync: SyncSettings,
    /// `SQLite` store location and pool.
    pub store: StoreSettings,
    /// Trigger secrets.
    pub auth: AuthSettings,
    /// Dashboard read endpoint.
    pub dashboard: DashboardSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl PulseSettings {
    /// Correct out-of-range values in place, logging each correction.
    ///
    /// Called automatically during loading.
    pub fn validate(&mut self) {
        let gh = &mut self.github;
        if gh.per_page == 0 || gh.per_page > MAX_PER_PAGE {
            let clamped = gh.per_page.clamp(1, MAX_PER_PAGE);
            tracing::warn!(per_page = gh.per_page, clamped, "github.perPage out of range, clamped");
            gh.per_page = clamped;
        }

        let sync = &mut self.sync;
        for (key, days) in [
            ("sync.fullLookbackDays", &mut sync.full_lookback_days),
            ("sync.incrementalLookbackDays", &mut sync.incremental_lookback_days),
        ] {
            if *days == 0 || *days > MAX_LOOKBACK_DAYS {
                let clamped = (*days).clamp(1, MAX_LOOKBACK_DAYS);
                tracing::warn!(key, days = *days, clamped, "lookback out of range, clamped");
                *days = clamped;
            }
        }
        if sync.schedule.hour_utc > 23 {
            tracing::warn!(hour = sync.schedule.hour_utc, "sync.schedule.hourUtc > 23, using 0");
            sync.schedule.hour_utc = 0;
        }

        if self.store.pool_size == 0 {
            self.store.pool_size = 1;
        }
    }
}

/// HTTP listener settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
        }
    }
}

/// Upstream GitHub API settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GithubSettings {
    /// REST API root, without a trailing slash.
    pub api_base_url: String,
    /// Personal access token. Usually supplied via `GITHUB_TOKEN`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Only commits authored with this email are persisted.
    pub author_email: String,
    /// Page size for paginated listings.
    pub per_page: u32,
    /// `User-Agent` header sent upstream.
    pub user_agent: String,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for GithubSettings {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.github.com".into(),
            token: None,
            author_email: "david.hague@gmail.com".into(),
            per_page: MAX_PER_PAGE,
            user_agent: concat!("pulse/", env!("CARGO_PKG_VERSION")).into(),
            request_timeout_ms: 30_000,
        }
    }
}

/// Which timestamp decides whether the mirror is stale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FreshnessBasis {
    /// Author date of the newest stored commit.
    #[default]
    LatestCommit,
    /// Completion time of the last successful sync pass.
    SyncCursor,
}

/// Sync windows and freshness threshold.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncSettings {
    /// Lookback for manual full resyncs and first runs.
    pub full_lookback_days: u32,
    /// Lookback for the cron-triggered incremental path.
    pub incremental_lookback_days: u32,
    /// Age at which the mirror counts as stale.
    pub stale_after_hours: u32,
    /// Timestamp used for the staleness decision.
    pub freshness_basis: FreshnessBasis,
    /// In-process daily schedule.
    pub schedule: ScheduleSettings,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            full_lookback_days: 730,
            incremental_lookback_days: 7,
            stale_after_hours: 24,
            freshness_basis: FreshnessBasis::LatestCommit,
            schedule: ScheduleSettings::default(),
        }
    }
}

/// Daily in-process scheduler.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleSettings {
    /// Run the scheduler alongside the server.
    pub enabled: bool,
    /// Run a freshness check immediately at startup.
    pub run_on_startup: bool,
    /// UTC hour of the daily check.
    pub hour_utc: u32,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            run_on_startup: true,
            hour_utc: 0,
        }
    }
}

/// `SQLite` store settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreSettings {
    /// Database file path. Empty means `~/.pulse/pulse.db`.
    pub db_path: String,
    /// Maximum pooled connections.
    pub pool_size: u32,
    /// `SQLite` busy timeout in milliseconds.
    pub busy_timeout_ms: u32,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            db_path: String::new(),
            pool_size: 4,
            busy_timeout_ms: 30_000,
        }
    }
}

/// Trigger secrets. Usually supplied via `CRON_SECRET` / `ADMIN_TOKEN`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthSettings {
    /// Bearer secret for the scheduled trigger.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cron_secret: Option<String>,
    /// Password for the manual full resync.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_token: Option<String>,
}

/// Dashboard read endpoint settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardSettings {
    /// Default start of the dashboard window.
    pub data_start: NaiveDate,
    /// How long a dashboard response is cached.
    pub cache_ttl_secs: u64,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            data_start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            cache_ttl_secs: 4 * 60 * 60,
        }
    }
}

/// Log output settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
