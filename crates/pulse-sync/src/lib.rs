//! # pulse-sync
//!
//! Mirrors one author's recent activity from a [`RepositorySource`] into a
//! [`SyncStore`].
//!
//! - [`SyncOrchestrator`]: freshness check, full and incremental passes
//! - [`freshness`]: the pure staleness decision
//! - [`SyncReport`] / [`SyncOutcome`]: what a pass did, including skipped
//!   upstream failures
//! - [`Scheduler`]: daily background check
//!
//! ## Crate Position
//!
//! Depends on `pulse-core`, `pulse-settings`, `pulse-github`, `pulse-store`.
//! Depended on by `pulse-server` and the `pulse` binary.
//!
//! [`RepositorySource`]: pulse_github::RepositorySource
//! [`SyncStore`]: pulse_store::SyncStore

#![deny(unsafe_code)]

pub mod errors;
pub mod freshness;
pub mod metrics;
pub mod orchestrator;
pub mod report;
pub mod scheduler;

pub use errors::{Result, SyncError};
pub use orchestrator::{SyncHook, SyncOrchestrator};
pub use report::{FailureStage, SyncOutcome, SyncReport, UpstreamFailure};
pub use scheduler::{Scheduler, next_run_after};
