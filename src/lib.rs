//! dependagraph crate
//!
//! This crate is an implementation detail of the `dependagraph` tool. It grows a directed graph of
//! repository dependency relationships by crawling GitHub: for a target repository it collects the
//! repositories it depends on and the repositories that depend on it, merges that window into a
//! persistent graph, and can keep going by picking the next unexplored node from the stored graph.
//!
//! # Module Organization
//!
//! - [`identity`]: Canonical repository identities
//! - [`collect`]: Rate-limited collection of dependents and dependencies
//! - [`graph`]: Persistent graph storage and frontier selection
//! - [`crawler`]: Orchestration of a crawl run
//! - [`config`]: Tunables loaded from the configuration file

/// Result type alias using `ohno::AppError` as the default error type.
pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

pub mod collect;
pub mod config;
pub mod crawler;
pub mod graph;
pub mod identity;
