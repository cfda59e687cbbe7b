use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::connection::{Connection, ExternalRepoSpec};
use crate::platform::RemoteRepository;

/// Default capacity of the queue between strategy tasks and dedup.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Default number of strategy tasks allowed to run at once per connection.
pub const DEFAULT_MAX_CONCURRENT_STRATEGIES: usize = 4;

/// Default pause between two sync passes of one connection.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(60);

/// Below this many remaining requests a worker waits for the quota to reset.
pub const DEFAULT_RATE_LIMIT_FLOOR: i64 = 200;

/// Added to the reset time when waiting out an exhausted quota.
pub const EXHAUSTION_SLACK: Duration = Duration::from_secs(10);

/// Bounds on one connection's enumeration pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumerationSettings {
    pub queue_capacity: usize,
    pub max_concurrent_strategies: usize,
}

impl Default for EnumerationSettings {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_concurrent_strategies: DEFAULT_MAX_CONCURRENT_STRATEGIES,
        }
    }
}

/// Settings for the sync workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Pause between passes.
    pub interval: Duration,
    /// Remaining-quota floor that triggers the exhaustion pause.
    pub rate_limit_floor: i64,
    pub enumeration: EnumerationSettings,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SYNC_INTERVAL,
            rate_limit_floor: DEFAULT_RATE_LIMIT_FLOOR,
            enumeration: EnumerationSettings::default(),
        }
    }
}

/// Request to create a catalog record for a repository or update the existing one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoCreateOrUpdateRequest {
    /// Local URI, e.g. `github.com/acme/widgets`.
    pub uri: String,
    pub external_repo: ExternalRepoSpec,
    pub description: String,
    pub fork: bool,
    /// Enablement for newly created records.
    pub enabled: bool,
    pub clone_url: String,
}

impl RepoCreateOrUpdateRequest {
    pub fn new(conn: &Connection, repo: &RemoteRepository) -> Self {
        Self {
            uri: conn.repo_uri(repo),
            external_repo: conn.external_repo_spec(repo),
            description: repo.description.clone(),
            fork: repo.is_fork,
            enabled: conn.initial_enablement(),
            clone_url: conn.authenticated_clone_url(repo),
        }
    }
}

/// Counts from one sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[must_use]
pub struct SyncPassResult {
    /// Distinct repositories that came out of dedup.
    pub discovered: usize,
    /// Requests accepted by the catalog channel.
    pub sent: usize,
    /// The catalog receiver was gone; the worker should stop.
    pub catalog_closed: bool,
}
