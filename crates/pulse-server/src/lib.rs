//! # pulse-server
//!
//! Axum HTTP surface for pulse.
//!
//! - Sync triggers: `/api/github/cron-refresh` (bearer secret, incremental)
//!   and `/api/github/refresh` (admin password, full resync)
//! - Dashboard read API: `/api/github/projects` behind an injected TTL cache
//!   that every successful sync clears, `/api/github/status`, and the live
//!   `/api/github/gists` listing
//! - `/health` and Prometheus `/metrics`
//! - Graceful shutdown via a `CancellationToken` shared with the scheduler

#![deny(unsafe_code)]

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod metrics;
pub mod server;
pub mod shutdown;

pub use config::ServerConfig;
pub use errors::ApiError;
pub use server::{AppState, GistCache, ProjectCache, PulseServer, invalidate_on_sync};
pub use shutdown::ShutdownCoordinator;
