//! Sharekeeper Core Library
//!
//! Keeps a curated list of file-sharing share pages resolvable to their
//! current direct-download URLs, re-checking the whole set on a schedule and
//! recording liveness per link.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`resolver`] - Share page to direct URL, via an ordered strategy chain
//! - [`maintenance`] - Batched, retrying re-resolution of every stored link
//! - [`store`] - Link persistence (`SQLite` or in-memory)
//! - [`service`] - Add / delete / list / trigger operations
//! - [`config`] - TOML configuration for tuning knobs
//! - [`db`] - Database connection and schema management

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod db;
pub mod maintenance;
pub mod resolver;
pub mod service;
pub mod store;
mod user_agent;

// Re-export commonly used types
pub use config::{Config, ConfigError, LoadedConfig};
pub use db::{Database, DbError};
pub use maintenance::{
    EngineError, MaintenanceEngine, MaintenanceSettings, RetryPolicy, RunStats, Scheduler,
};
pub use resolver::{
    LinkResolver, ResolveError, ResolvedUrl, Resolver, ResolverHttpSettings,
    build_default_resolver,
};
pub use service::{AddSummary, LinkService, LinkSnapshot};
pub use store::{Link, LinkStatus, LinkStore, MemoryLinkStore, SqliteLinkStore, StoreError};
