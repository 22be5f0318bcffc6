//! `PulseServer`: axum HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use pulse_core::{Cache, Gist, MemoryCache, Project};
use pulse_github::GistSource;
use pulse_store::DashboardStore;
use pulse_sync::{SyncOrchestrator, SyncReport};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::config::ServerConfig;
use crate::handlers;
use crate::metrics::track_requests;
use crate::shutdown::ShutdownCoordinator;

/// Cache of dashboard responses keyed by window start.
pub type ProjectCache = Arc<dyn Cache<Vec<Project>>>;

/// Cache of live gist listings keyed by window start.
pub type GistCache = Arc<dyn Cache<Vec<Gist>>>;

/// Hook for [`SyncOrchestrator::on_synced`] that clears `cache`.
///
/// Every pass goes through the orchestrator, so HTTP triggers, the
/// scheduler, and the CLI all invalidate the dashboard the same way.
pub fn invalidate_on_sync(cache: &ProjectCache) -> impl Fn(&SyncReport) + Send + Sync + 'static {
    let cache = Arc::clone(cache);
    move |report| {
        debug!(run_id = %report.run_id, "sync finished, clearing dashboard cache");
        cache.clear();
    }
}

/// Shared state accessible from axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Runs sync passes.
    pub orchestrator: Arc<SyncOrchestrator>,
    /// Read side of the store.
    pub dashboard: Arc<dyn DashboardStore>,
    /// Live gist listing.
    pub gists: Arc<dyn GistSource>,
    /// Dashboard response cache, cleared after each successful sync.
    pub cache: ProjectCache,
    /// Gist response cache.
    pub gist_cache: GistCache,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

/// The pulse HTTP server.
pub struct PulseServer {
    state: AppState,
    shutdown: Arc<ShutdownCoordinator>,
}

impl PulseServer {
    /// Create a new server.
    ///
    /// `cache` should be the one the orchestrator clears through
    /// [`invalidate_on_sync`].
    pub fn new(
        config: ServerConfig,
        orchestrator: Arc<SyncOrchestrator>,
        dashboard: Arc<dyn DashboardStore>,
        gists: Arc<dyn GistSource>,
        cache: ProjectCache,
    ) -> Self {
        Self {
            state: AppState {
                orchestrator,
                dashboard,
                gists,
                cache,
                gist_cache: Arc::new(MemoryCache::<Vec<Gist>>::new()),
                config: Arc::new(config),
                start_time: Instant::now(),
                metrics: None,
            },
            shutdown: Arc::new(ShutdownCoordinator::new()),
        }
    }

    /// Serve `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.state.metrics = Some(handle);
        self
    }

    /// Build the axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route(
                "/api/github/cron-refresh",
                get(handlers::cron_refresh).post(handlers::cron_refresh),
            )
            .route("/api/github/refresh", post(handlers::manual_refresh))
            .route("/api/github/projects", get(handlers::projects))
            .route("/api/github/gists", get(handlers::gists))
            .route("/api/github/status", get(handlers::status))
            .route("/health", get(handlers::health_handler))
            .route("/metrics", get(handlers::metrics_handler))
            .layer(middleware::from_fn(track_requests))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// Shutdown coordinator shared with background tasks.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Bind and serve until the shutdown token is cancelled.
    ///
    /// The serving task is registered with the shutdown coordinator as
    /// `http`. Returns the bound address.
    pub async fn listen(&self) -> std::io::Result<SocketAddr> {
        let listener = TcpListener::bind(self.config().bind_addr()).await?;
        let addr = listener.local_addr()?;
        let router = self.router();
        let token = self.shutdown.token();

        let handle = tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(token.cancelled_owned())
                .await;
            if let Err(e) = served {
                error!(error = %e, "http server stopped with error");
            }
            info!("http server stopped");
        });
        self.shutdown.register("http", handle);
        Ok(addr)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
