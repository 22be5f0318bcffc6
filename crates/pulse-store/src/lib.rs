//! # pulse-store
//!
//! Durable mirror of repositories, authored commits, and the sync cursor,
//! backed by `SQLite`.
//!
//! - **Connection**: r2d2 pool with WAL and foreign keys ([`connection`])
//! - **Migrations**: embedded SQL, versioned in `schema_version` ([`migrations`])
//! - **Repositories**: stateless per-table operations ([`repositories`])
//! - **Store**: [`SyncStore`] / [`DashboardStore`] traits and [`SqliteStore`]
//!
//! ## Crate Position
//!
//! Depends on `pulse-core`. Depended on by `pulse-sync` and `pulse-server`.

#![deny(unsafe_code)]

pub mod connection;
pub mod errors;
pub mod migrations;
pub mod repositories;
pub mod store;

pub use connection::ConnectionConfig;
pub use errors::{Result, StoreError};
pub use store::{DashboardStore, SqliteStore, StoreStats, SyncStore};
