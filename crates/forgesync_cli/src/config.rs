//! Configuration file support for forgesync.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. Legacy lookup variables (`BYPASS_GITHUB_API`, `GITHUB_API_MIN_RATE_LIMIT`)
//! 2. Environment variables prefixed with `FORGESYNC_`, sections split by a
//!    double underscore (e.g. `FORGESYNC_SYNC__INTERVAL_SECS`)
//! 3. Config file (`--config`, or ./forgesync.toml over ~/.config/forgesync/config.toml)
//! 4. Built-in defaults
//!
//! Example config file:
//! ```toml
//! [[github]]
//! url = "https://ghe.example.com"
//! token = "ghp_..."
//! repository_query = ["public", "affiliated"]
//! repos = ["acme/widgets"]
//! repository_path_pattern = "{host}/{nameWithOwner}"
//! initial_repository_enablement = true
//! git_url_type = "ssh"
//!
//! [client]
//! requests_per_second = 10
//! timeout_secs = 30
//! max_retries = 3
//! etag_cache_capacity = 1024
//!
//! [sync]
//! interval_secs = 60
//! rate_limit_floor = 200
//! queue_capacity = 100
//! max_concurrent_strategies = 4
//!
//! [lookup]
//! bypass_api = false
//! min_rate_limit = 0
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use forgesync::connection::ClientSettings;
use forgesync::retry::RetryConfig;
use forgesync::sync::{
    DEFAULT_MAX_CONCURRENT_STRATEGIES, DEFAULT_QUEUE_CAPACITY, DEFAULT_RATE_LIMIT_FLOOR,
    DEFAULT_SYNC_INTERVAL, EnumerationSettings,
};
use forgesync::platform::DEFAULT_ETAG_CACHE_CAPACITY;
use forgesync::{ConnectionConfig, LookupSettings, SyncSettings, rate_limits};
use serde::Deserialize;

/// Name of the per-directory config file.
const LOCAL_CONFIG_FILE: &str = "forgesync.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configured GitHub and GitHub Enterprise connections.
    pub github: Vec<ConnectionConfig>,
    /// API client options shared by all connections.
    pub client: ClientConfig,
    /// Sync worker options.
    pub sync: SyncConfig,
    /// On-demand lookup options.
    pub lookup: LookupSettings,
}

/// API client options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Proactive request cap per connection; 0 disables it.
    pub requests_per_second: u32,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Retries for transient API failures.
    pub max_retries: usize,
    /// REST responses kept per connection for conditional requests; 0 disables it.
    pub etag_cache_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            requests_per_second: rate_limits::GITHUB_DEFAULT_RPS,
            timeout_secs: 30,
            max_retries: forgesync::retry::MAX_RETRIES,
            etag_cache_capacity: DEFAULT_ETAG_CACHE_CAPACITY,
        }
    }
}

/// Sync worker options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Pause between passes of one connection.
    pub interval_secs: u64,
    /// Remaining quota below which a worker waits for the reset.
    pub rate_limit_floor: i64,
    /// Buffer between enumeration strategies and dedup.
    pub queue_capacity: usize,
    /// Strategies of one connection allowed to run at once.
    pub max_concurrent_strategies: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_SYNC_INTERVAL.as_secs(),
            rate_limit_floor: DEFAULT_RATE_LIMIT_FLOOR,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_concurrent_strategies: DEFAULT_MAX_CONCURRENT_STRATEGIES,
        }
    }
}

impl Config {
    /// Load configuration, falling back to defaults when it cannot be read.
    pub fn load(explicit: Option<&Path>) -> Self {
        match Self::try_load(explicit) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config: {}", e);
                Config::default()
            }
        }
    }

    /// Load configuration from every source.
    ///
    /// With `explicit`, that file is required and the default locations are
    /// not consulted.
    pub fn try_load(explicit: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = ConfigBuilder::builder();

        match explicit {
            Some(path) => {
                tracing::debug!("Loading config from {:?}", path);
                builder = builder.add_source(
                    File::from(path.to_path_buf())
                        .format(FileFormat::Toml)
                        .required(true),
                );
            }
            None => {
                for path in Self::default_sources() {
                    tracing::debug!("Loading config from {:?}", path);
                    builder = builder.add_source(
                        File::from(path).format(FileFormat::Toml).required(false),
                    );
                }
            }
        }

        // e.g., FORGESYNC_LOOKUP__MIN_RATE_LIMIT -> lookup.min_rate_limit
        builder = builder.add_source(
            Environment::with_prefix("FORGESYNC")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: Config = builder.build()?.try_deserialize()?;
        config.lookup = config.lookup.with_env_overrides();
        Ok(config)
    }

    /// Existing config files in load order: XDG first, then ./forgesync.toml.
    pub fn default_sources() -> Vec<PathBuf> {
        let mut sources = Vec::new();
        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            sources.push(xdg_config);
        }
        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            sources.push(local_config);
        }
        sources
    }

    /// Files whose changes should trigger a reload, including default
    /// locations that do not exist yet.
    pub fn watched_files(explicit: Option<&Path>) -> Vec<PathBuf> {
        match explicit {
            Some(path) => vec![path.to_path_buf()],
            None => Self::default_config_path()
                .into_iter()
                .chain(std::iter::once(PathBuf::from(LOCAL_CONFIG_FILE)))
                .collect(),
        }
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "forgesync").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn client_settings(&self) -> ClientSettings {
        let retry = if self.client.max_retries == 0 {
            RetryConfig::disabled()
        } else {
            RetryConfig {
                max_retries: self.client.max_retries,
                ..RetryConfig::default()
            }
        };
        ClientSettings {
            requests_per_second: self.client.requests_per_second,
            timeout: Duration::from_secs(self.client.timeout_secs.max(1)),
            retry,
            etag_cache_capacity: self.client.etag_cache_capacity,
        }
    }

    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            interval: Duration::from_secs(self.sync.interval_secs),
            rate_limit_floor: self.sync.rate_limit_floor,
            enumeration: EnumerationSettings {
                queue_capacity: self.sync.queue_capacity.max(1),
                max_concurrent_strategies: self.sync.max_concurrent_strategies.max(1),
            },
        }
    }
}
