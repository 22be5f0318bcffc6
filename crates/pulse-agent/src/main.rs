//! # pulse-agent
//!
//! The `pulse` binary. Wires settings, the GitHub client, the `SQLite`
//! store, and the sync orchestrator together, then either serves HTTP with
//! the daily scheduler or runs a single command and prints JSON.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pulse_core::{MemoryCache, Project};
use pulse_github::GithubClient;
use pulse_server::{ProjectCache, PulseServer, ServerConfig, invalidate_on_sync};
use pulse_settings::{MAX_LOOKBACK_DAYS, PulseSettings};
use pulse_store::{ConnectionConfig, DashboardStore, SqliteStore};
use pulse_sync::{Scheduler, SyncOrchestrator};

/// Mirror your recent GitHub activity into a local database.
#[derive(Parser, Debug)]
#[command(name = "pulse", version, about)]
struct Cli {
    /// Settings file (default `~/.pulse/settings.json`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// `SQLite` database path (overrides settings).
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API and run the daily sync check.
    Serve {
        /// Host to bind (overrides settings).
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (overrides settings).
        #[arg(long)]
        port: Option<u16>,
        /// Do not start the background scheduler.
        #[arg(long)]
        no_schedule: bool,
    },
    /// Run one sync pass and print its report.
    Sync {
        /// Lookback window in days (default: the full lookback).
        #[arg(
            long,
            conflicts_with = "incremental",
            value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_LOOKBACK_DAYS))
        )]
        days: Option<u32>,
        /// Use the short incremental window.
        #[arg(long)]
        incremental: bool,
    },
    /// Sync only if the mirror is missing or stale.
    Check,
    /// Print store statistics.
    Status,
}

fn load_settings(cli: &Cli) -> Result<PulseSettings> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(pulse_settings::settings_path);
    let mut settings = pulse_settings::load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    if let Some(db_path) = &cli.db_path {
        settings.store.db_path = db_path.to_string_lossy().into_owned();
    }
    Ok(settings)
}

fn resolve_db_path(settings: &PulseSettings) -> PathBuf {
    if settings.store.db_path.is_empty() {
        pulse_settings::pulse_home().join("pulse.db")
    } else {
        PathBuf::from(&settings.store.db_path)
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

fn open_store(settings: &PulseSettings) -> Result<Arc<SqliteStore>> {
    let db_path = resolve_db_path(settings);
    ensure_parent_dir(&db_path)?;
    let config = ConnectionConfig {
        pool_size: settings.store.pool_size,
        busy_timeout_ms: settings.store.busy_timeout_ms,
    };
    let store = SqliteStore::open(&db_path.to_string_lossy(), &config)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    tracing::info!(path = %db_path.display(), "database ready");
    Ok(Arc::new(store))
}

fn github_client(settings: &PulseSettings) -> Result<Arc<GithubClient>> {
    if settings.github.token.is_none() {
        tracing::warn!("GITHUB_TOKEN is not set, upstream requests will be unauthenticated");
    }
    let client = GithubClient::new(&settings.github).context("Failed to build GitHub client")?;
    Ok(Arc::new(client))
}

fn build_orchestrator(
    settings: &PulseSettings,
    client: Arc<GithubClient>,
    store: Arc<SqliteStore>,
) -> SyncOrchestrator {
    SyncOrchestrator::new(
        client,
        store,
        settings.github.author_email.clone(),
        settings.sync.clone(),
    )
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings(&cli)?;
    pulse_core::logging::init_subscriber(&settings.logging.level, settings.logging.json);

    let store = open_store(&settings)?;

    match cli.command {
        Command::Serve {
            host,
            port,
            no_schedule,
        } => {
            if let Some(host) = host {
                settings.server.host = host;
            }
            if let Some(port) = port {
                settings.server.port = port;
            }
            serve(&settings, store, !no_schedule).await
        }
        Command::Sync { days, incremental } => {
            let orchestrator = build_orchestrator(&settings, github_client(&settings)?, store);
            let report = match (incremental, days) {
                (true, _) => orchestrator.incremental_sync().await?,
                (false, Some(days)) => orchestrator.full_sync(days).await?,
                (false, None) => orchestrator.full_resync().await?,
            };
            print_json(&report)
        }
        Command::Check => {
            let orchestrator = build_orchestrator(&settings, github_client(&settings)?, store);
            print_json(&orchestrator.check_and_update().await?)
        }
        Command::Status => print_json(&store.stats()?),
    }
}

async fn serve(settings: &PulseSettings, store: Arc<SqliteStore>, schedule: bool) -> Result<()> {
    let metrics = pulse_server::metrics::install_recorder()
        .context("Failed to install metrics recorder")?;
    let client = github_client(settings)?;
    let cache: ProjectCache = Arc::new(MemoryCache::<Vec<Project>>::new());
    let orchestrator = build_orchestrator(settings, client.clone(), store.clone())
        .on_synced(invalidate_on_sync(&cache));
    let orchestrator = Arc::new(orchestrator);

    let config = ServerConfig::from_settings(settings);
    if config.cron_secret.is_none() {
        tracing::warn!("CRON_SECRET is not set, cron refresh will answer 500");
    }
    let server = PulseServer::new(config, orchestrator.clone(), store, client, cache)
        .with_metrics(metrics);

    if schedule {
        let token = server.shutdown().token();
        let plan = settings.sync.schedule.clone();
        if let Some(handle) = Scheduler::spawn(orchestrator, plan, token) {
            server.shutdown().register("scheduler", handle);
        }
    }

    let addr = server.listen().await.context("Failed to bind server")?;
    tracing::info!("pulse listening on http://{addr}");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    let unfinished = server.shutdown().drain().await;
    if unfinished.is_empty() {
        tracing::info!("Shutdown complete");
    } else {
        tracing::warn!(tasks = ?unfinished, "Shutdown complete with aborted tasks");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_flags() {
        let cli = Cli::parse_from(["pulse", "serve", "--port", "8080", "--no-schedule"]);
        match cli.command {
            Command::Serve {
                host,
                port,
                no_schedule,
            } => {
                assert!(host.is_none());
                assert_eq!(port, Some(8080));
                assert!(no_schedule);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["pulse", "status", "--db-path", "/tmp/p.db"]);
        assert_eq!(cli.db_path, Some(PathBuf::from("/tmp/p.db")));
    }

    #[test]
    fn days_conflicts_with_incremental() {
        assert!(Cli::try_parse_from(["pulse", "sync", "--days", "3", "--incremental"]).is_err());
    }

    #[test]
    fn days_must_be_within_range() {
        for days in ["0", "36501", "200000000"] {
            assert!(
                Cli::try_parse_from(["pulse", "sync", "--days", days]).is_err(),
                "--days {days} accepted"
            );
        }
        let cli = Cli::parse_from(["pulse", "sync", "--days", "36500"]);
        assert!(matches!(
            cli.command,
            Command::Sync {
                days: Some(36_500),
                incremental: false
            }
        ));
    }

    #[test]
    fn db_path_flag_overrides_settings() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = dir.path().join("settings.json");
        std::fs::write(&cfg, r#"{"store": {"dbPath": "/from/file.db"}}"#).unwrap();
        let db = dir.path().join("cli.db");

        let cli = Cli::parse_from([
            "pulse",
            "--config",
            cfg.to_str().unwrap(),
            "--db-path",
            db.to_str().unwrap(),
            "status",
        ]);
        let settings = load_settings(&cli).unwrap();
        assert_eq!(resolve_db_path(&settings), db);
    }

    #[test]
    fn empty_db_path_defaults_under_pulse_home() {
        let settings = PulseSettings::default();
        assert!(resolve_db_path(&settings).ends_with("pulse.db"));
    }

    #[test]
    fn open_store_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = PulseSettings::default();
        settings.store.db_path = dir
            .path()
            .join("nested/deeper/pulse.db")
            .to_string_lossy()
            .into_owned();
        let store = open_store(&settings).unwrap();
        assert_eq!(store.stats().unwrap().commits, 0);
    }
}
