//! HTTP error type.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pulse_github::GithubError;
use pulse_store::StoreError;
use pulse_sync::SyncError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors returned by route handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or wrong credentials.
    #[error("Unauthorized")]
    Unauthorized,

    /// The trigger's secret is not configured.
    #[error("{0}")]
    NotConfigured(&'static str),

    /// Malformed request.
    #[error("{0}")]
    BadRequest(String),

    /// A sync pass failed.
    #[error("Error refreshing GitHub data")]
    Sync(#[from] SyncError),

    /// A dashboard read failed.
    #[error("Error loading GitHub data")]
    Store(#[from] StoreError),

    /// A live upstream listing failed.
    #[error("Failed to fetch gists")]
    Upstream(#[source] GithubError),

    /// A blocking store task panicked or was cancelled.
    #[error("Error loading GitHub data")]
    Blocking(#[from] tokio::task::JoinError),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(GithubError::Upstream { status, .. }) => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::NotConfigured(_) | Self::Sync(_) | Self::Store(_) | Self::Blocking(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Sync(e) => error!(error = %e, "sync request failed"),
            Self::Store(e) => error!(error = %e, "dashboard read failed"),
            Self::Upstream(e) => error!(error = %e, "upstream listing failed"),
            Self::Blocking(e) => error!(error = %e, "store task failed"),
            Self::NotConfigured(what) => error!(what, "trigger not configured"),
            Self::Unauthorized | Self::BadRequest(_) => {}
        }
        let body = Json(json!({ "success": false, "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}
