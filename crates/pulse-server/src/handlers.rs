//! Route handlers.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use chrono::{DateTime, NaiveDate, Utc};
use pulse_core::{Gist, Project};
use pulse_store::StoreStats;
use pulse_sync::SyncReport;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::{bearer_token, secrets_match};
use crate::errors::ApiError;
use crate::health::{self, HealthResponse};
use crate::server::AppState;

/// Successful trigger response.
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// Always `true`.
    pub success: bool,
    /// Human-readable summary.
    pub message: &'static str,
    /// When the response was produced.
    pub timestamp: DateTime<Utc>,
    /// What the pass did.
    pub report: SyncReport,
}

impl RefreshResponse {
    fn ok(report: SyncReport) -> Json<Self> {
        Json(Self {
            success: true,
            message: "GitHub data refreshed successfully",
            timestamp: Utc::now(),
            report,
        })
    }
}

/// Manual refresh request body.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Must equal the configured admin token.
    #[serde(default)]
    pub password: String,
}

/// `?since=` query of the read endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct SinceQuery {
    /// RFC 3339 instant or `YYYY-MM-DD` date.
    pub since: Option<String>,
}

/// GET|POST /api/github/cron-refresh
pub async fn cron_refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RefreshResponse>, ApiError> {
    let secret = state
        .config
        .cron_secret
        .as_deref()
        .ok_or(ApiError::NotConfigured("Cron not configured"))?;
    let authorized = bearer_token(&headers).is_some_and(|token| secrets_match(token, secret));
    if !authorized {
        warn!("cron refresh rejected");
        return Err(ApiError::Unauthorized);
    }

    info!("cron refresh: starting incremental sync");
    let report = state.orchestrator.incremental_sync().await?;
    Ok(RefreshResponse::ok(report))
}

/// POST /api/github/refresh
pub async fn manual_refresh(
    State(state): State<AppState>,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let token = state
        .config
        .admin_token
        .as_deref()
        .ok_or(ApiError::NotConfigured("Refresh not configured"))?;
    if !secrets_match(&body.password, token) {
        warn!("manual refresh rejected");
        return Err(ApiError::Unauthorized);
    }

    info!("manual refresh: starting full resync");
    let report = state.orchestrator.full_resync().await?;
    Ok(RefreshResponse::ok(report))
}

/// GET /api/github/projects
pub async fn projects(
    State(state): State<AppState>,
    Query(query): Query<SinceQuery>,
) -> Result<Json<Vec<Project>>, ApiError> {
    let since = match query.since.as_deref() {
        Some(raw) => parse_since(raw)?,
        None => start_of_day(state.config.data_start),
    };
    let key = since.to_rfc3339();

    if let Some(hit) = state.cache.get(&key) {
        debug!(%since, "projects served from cache");
        return Ok(Json(hit));
    }

    let generation = state.cache.generation();
    let dashboard = state.dashboard.clone();
    let projects = tokio::task::spawn_blocking(move || dashboard.projects_since(since)).await??;
    let ttl = state.config.cache_ttl;
    if !state.cache.put_if_current(&key, projects.clone(), ttl, generation) {
        debug!(%since, "sync finished during read, not caching");
    }
    Ok(Json(projects))
}

/// GET /api/github/gists
pub async fn gists(
    State(state): State<AppState>,
    Query(query): Query<SinceQuery>,
) -> Result<Json<Vec<Gist>>, ApiError> {
    let raw = query
        .since
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("Missing required query parameter: since".into()))?;
    let since = parse_since(raw)?;
    let key = since.to_rfc3339();

    if let Some(hit) = state.gist_cache.get(&key) {
        debug!(%since, "gists served from cache");
        return Ok(Json(hit));
    }

    let gists = state
        .gists
        .list_gists(since)
        .await
        .map_err(ApiError::Upstream)?;
    state.gist_cache.put(&key, gists.clone(), state.config.cache_ttl);
    Ok(Json(gists))
}

/// GET /api/github/status
pub async fn status(State(state): State<AppState>) -> Result<Json<StoreStats>, ApiError> {
    let dashboard = state.dashboard.clone();
    let stats = tokio::task::spawn_blocking(move || dashboard.stats()).await??;
    Ok(Json(stats))
}

/// GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(state.start_time))
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    state
        .metrics
        .as_ref()
        .map(metrics_exporter_prometheus::PrometheusHandle::render)
        .unwrap_or_default()
}

fn parse_since(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(start_of_day)
        .map_err(|_| ApiError::BadRequest(format!("invalid since: {raw}")))
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}
