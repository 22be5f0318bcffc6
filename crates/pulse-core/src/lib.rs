//! # pulse-core
//!
//! Foundation types and utilities shared by every pulse crate.
//!
//! - **Records**: [`records::Repository`], [`records::Commit`], [`records::Branch`],
//!   plus the dashboard read model [`records::Project`] and live [`records::Gist`]s
//! - **Author filter**: [`records::retain_authored_by`]
//! - **Time**: [`time::lookback_since`] and [`time::age`]
//! - **Cache**: the injectable [`cache::Cache`] trait and [`cache::MemoryCache`]
//! - **Logging**: [`logging::init_subscriber`]
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other pulse crates.

#![deny(unsafe_code)]

pub mod cache;
pub mod logging;
pub mod records;
pub mod time;

pub use cache::{Cache, MemoryCache};
pub use records::{Branch, Commit, Gist, GistFile, Project, Repository, retain_authored_by};
