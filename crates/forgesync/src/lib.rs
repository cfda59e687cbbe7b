//! Forgesync - repository sync engine for GitHub-like code hosts.
//!
//! This library discovers repositories on one or more configured GitHub or
//! GitHub Enterprise instances, streams them to a catalog, and answers
//! on-demand lookups of single repositories.
//!
//! # Modules
//!
//! - [`connection`] - Connection construction and the hot-swappable registry
//! - [`github`] - REST and GraphQL client implementing [`RepositoryApi`]
//! - [`sync`] - Enumeration, dedup, per-connection workers and their supervisor
//! - [`resolver`] - Single-repository lookup with rate-limit bypass
//! - [`probe`] - Clonability checks used when the API is bypassed
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use forgesync::{ClientSettings, ConnectionRegistry, RepoLookupArgs, Resolver};
//!
//! let registry = Arc::new(ConnectionRegistry::new(ClientSettings::default()));
//! registry.reconfigure(&configs);
//!
//! let resolver = Resolver::new(registry, probe, LookupSettings::default().with_env_overrides());
//! let found = resolver.lookup(&RepoLookupArgs::by_uri("github.com/acme/widgets")).await?;
//! ```

pub mod connection;
pub mod github;
pub mod http;
pub mod platform;
pub mod probe;
pub mod resolver;
pub mod retry;
pub mod sync;

#[cfg(test)]
mod test_support;

pub use connection::{
    ClientSettings, CloneUrlStyle, ConfigError, Connection, ConnectionConfig, ConnectionRegistry,
    ExternalRepoSpec, ReconfigureReport,
};
pub use platform::{
    ApiRateLimiter, PlatformError, RateLimitMonitor, RateLimitSnapshot, RemoteRepository,
    RepositoryApi, rate_limits,
};
pub use probe::{CloneProbe, HttpCloneProbe, ProbeError};
pub use resolver::{
    LookupError, LookupSettings, RepoLookup, RepoLookupArgs, ResolvedRepo, Resolver,
};
pub use sync::{CatalogWriter, RepoCreateOrUpdateRequest, SyncSettings, SyncSupervisor};
