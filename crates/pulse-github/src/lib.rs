//! # pulse-github
//!
//! Repository Source backed by the GitHub REST API (v3).
//!
//! - [`RepositorySource`]: the trait the sync orchestrator depends on
//! - [`GistSource`]: live gist listing for the dashboard
//! - [`GithubClient`]: `reqwest` implementation with token auth
//! - [`types`]: wire payloads, validated into `pulse-core` records at the boundary
//!
//! The client reports every failure as a [`GithubError`]. Whether a failure
//! is skipped or fatal is decided by the caller.

#![deny(unsafe_code)]

pub mod client;
pub mod errors;
pub mod source;
pub mod types;

pub use client::GithubClient;
pub use errors::{GithubError, Result};
pub use source::{GistSource, MAX_PAGES, RepositorySource};
