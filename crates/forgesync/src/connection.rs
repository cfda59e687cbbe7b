//! Configured code host connections.
//!
//! A [`Connection`] is one tenant of a GitHub-like service: its identity URL,
//! derived API endpoint, credentials, enumeration policy, and the API client
//! used to reach it. Connections are immutable once built; the
//! [`ConnectionRegistry`] replaces them wholesale on reconfiguration.

mod error;
mod registry;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::github::{ApiEndpoints, GitHubClient};
use crate::http::HttpTransport;
use crate::http::reqwest_transport::{DEFAULT_TIMEOUT, ReqwestTransport};
use crate::platform::{
    ApiRateLimiter, DEFAULT_ETAG_CACHE_CAPACITY, RemoteRepository, RepositoryApi, rate_limits,
};
use crate::retry::RetryConfig;

pub use error::ConfigError;
pub use registry::{ConnectionBuilder, ConnectionRegistry, ReconfigureReport, RegistrySnapshot};

/// Service type carried in every [`ExternalRepoSpec`] this crate produces.
pub const SERVICE_TYPE: &str = "github";

/// Local URI pattern used when a connection does not configure one.
pub const DEFAULT_PATH_PATTERN: &str = "{host}/{nameWithOwner}";

/// Identity URL of the implicit public cloud connection.
pub const PUBLIC_CLOUD_URL: &str = "https://github.com";

/// API root of the public cloud.
pub const PUBLIC_CLOUD_API: &str = "https://api.github.com";

const PUBLIC_CLOUD_HOSTS: [&str; 3] = ["github.com", "www.github.com", "api.github.com"];

/// Enumeration strategy names understood by the enumerator.
pub mod strategies {
    pub const PUBLIC: &str = "public";
    pub const AFFILIATED: &str = "affiliated";
    pub const NONE: &str = "none";
}

/// How clone URLs handed to the catalog are formed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloneUrlStyle {
    /// HTTPS URL from the API, with the token embedded when one is configured.
    #[default]
    Http,
    /// `git@host:owner/name.git`.
    Ssh,
}

/// One `[[github]]` configuration entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Web URL of the instance, e.g. `https://github.com` or `https://ghe.example.com`.
    pub url: String,
    /// Personal access token.
    pub token: Option<String>,
    /// Enumeration strategies; empty means the per-instance default.
    pub repository_query: Vec<String>,
    /// Repositories (`owner/name`) to sync in addition to the strategies.
    pub repos: Vec<String>,
    /// Local URI template with `{host}` and `{nameWithOwner}` placeholders.
    pub repository_path_pattern: Option<String>,
    /// PEM certificate(s) to trust for this instance.
    pub certificate: Option<String>,
    /// Whether newly discovered repositories start enabled.
    pub initial_repository_enablement: bool,
    pub git_url_type: CloneUrlStyle,
}

impl ConnectionConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// The entry synthesized when no configured entry points at the public cloud.
    ///
    /// It disables enumeration but lets lookups of `github.com/...` URIs resolve.
    pub fn implicit_public_cloud() -> Self {
        Self {
            url: PUBLIC_CLOUD_URL.to_string(),
            repository_query: vec![strategies::NONE.to_string()],
            initial_repository_enablement: true,
            ..Self::default()
        }
    }

    /// Whether the entry's URL names a public cloud host. Unparseable URLs are not.
    pub fn targets_public_cloud(&self) -> bool {
        Url::parse(self.url.trim())
            .ok()
            .and_then(|u| u.host_str().map(is_public_cloud_host))
            .unwrap_or(false)
    }

    fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Settings shared by every API client the registry builds.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Proactive requests-per-second cap; `0` disables it.
    pub requests_per_second: u32,
    pub timeout: Duration,
    pub retry: RetryConfig,
    /// Cached REST responses per connection for `If-None-Match`; `0` disables it.
    pub etag_cache_capacity: usize,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            requests_per_second: rate_limits::GITHUB_DEFAULT_RPS,
            timeout: DEFAULT_TIMEOUT,
            retry: RetryConfig::default(),
            etag_cache_capacity: DEFAULT_ETAG_CACHE_CAPACITY,
        }
    }
}

/// External identity of a repository: the service it lives on and its
/// service-scoped ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalRepoSpec {
    /// Opaque repository ID on the service.
    pub id: String,
    /// Always [`SERVICE_TYPE`] for repositories from this crate.
    pub service_type: String,
    /// Identity URL of the connection.
    pub service_id: String,
}

/// Returns true for hostnames of the public cloud (case-insensitive).
pub fn is_public_cloud_host(host: &str) -> bool {
    PUBLIC_CLOUD_HOSTS
        .iter()
        .any(|known| host.eq_ignore_ascii_case(known))
}

/// Parse a connection URL and normalize it: lowercase host, no trailing slash.
pub fn normalize_base_url(raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();
    let mut url = Url::parse(trimmed).map_err(|e| ConfigError::invalid_url(raw, e.to_string()))?;

    let Some(host) = url.host_str().filter(|h| !h.is_empty()) else {
        return Err(ConfigError::invalid_url(raw, "URL has no host"));
    };
    let host = host.to_ascii_lowercase();
    url.set_host(Some(&host))
        .map_err(|e| ConfigError::invalid_url(raw, e.to_string()))?;

    let path = url.path().trim_end_matches('/').to_string();
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// String form of a normalized URL without the trailing slash `Url` adds to
/// an empty path.
fn identity_string(url: &Url) -> String {
    url.as_str().trim_end_matches('/').to_string()
}

/// A configured tenant of a GitHub-like service.
pub struct Connection {
    identity_url: String,
    api_endpoint: String,
    original_hostname: String,
    is_public_cloud: bool,
    token: Option<String>,
    repository_query: Vec<String>,
    path_pattern: String,
    explicit_repos: Vec<String>,
    initial_enablement: bool,
    clone_url_style: CloneUrlStyle,
    api: Arc<dyn RepositoryApi>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("identity_url", &self.identity_url)
            .field("api_endpoint", &self.api_endpoint)
            .field("is_public_cloud", &self.is_public_cloud)
            .field("authenticated", &self.token.is_some())
            .field("repository_query", &self.repository_query)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Build a connection and its GitHub client from a configuration entry.
    ///
    /// Sets up the HTTP transport (trusting `certificate` when present) but
    /// sends no request, so an unreachable instance still yields a connection.
    pub fn from_config(
        config: &ConnectionConfig,
        settings: &ClientSettings,
    ) -> Result<Self, ConfigError> {
        let base = normalize_base_url(&config.url)?;
        let identity_url = identity_string(&base);
        let is_public_cloud = base.host_str().is_some_and(is_public_cloud_host);
        let api_endpoint = derive_api_endpoint(&base, is_public_cloud);

        let transport: Arc<dyn HttpTransport> =
            match config.certificate.as_deref().filter(|c| !c.trim().is_empty()) {
                Some(pem) => Arc::new(
                    ReqwestTransport::with_certificate(pem, settings.timeout).map_err(|e| {
                        ConfigError::InvalidCertificate {
                            url: identity_url.clone(),
                            message: e.to_string(),
                        }
                    })?,
                ),
                None => Arc::new(ReqwestTransport::with_timeout(settings.timeout).map_err(
                    |source| ConfigError::Client {
                        url: identity_url.clone(),
                        source,
                    },
                )?),
            };

        let rate_limiter = (settings.requests_per_second > 0)
            .then(|| ApiRateLimiter::new(settings.requests_per_second));
        let client = GitHubClient::new(
            ApiEndpoints::new(&api_endpoint, is_public_cloud),
            config.token().map(str::to_string),
            transport,
        )
        .with_rate_limiter(rate_limiter)
        .with_retry(settings.retry.clone())
        .with_etag_cache(settings.etag_cache_capacity);

        Ok(Self::assemble(
            config,
            &base,
            identity_url,
            api_endpoint,
            Arc::new(client),
        ))
    }

    /// Build a connection around an existing API implementation.
    pub fn with_api(
        config: &ConnectionConfig,
        api: Arc<dyn RepositoryApi>,
    ) -> Result<Self, ConfigError> {
        let base = normalize_base_url(&config.url)?;
        let identity_url = identity_string(&base);
        let is_public_cloud = base.host_str().is_some_and(is_public_cloud_host);
        let api_endpoint = derive_api_endpoint(&base, is_public_cloud);
        Ok(Self::assemble(config, &base, identity_url, api_endpoint, api))
    }

    fn assemble(
        config: &ConnectionConfig,
        base: &Url,
        identity_url: String,
        api_endpoint: String,
        api: Arc<dyn RepositoryApi>,
    ) -> Self {
        let original_hostname = base.host_str().unwrap_or_default().to_string();
        let is_public_cloud = is_public_cloud_host(&original_hostname);

        // Listing every repository on the public cloud is never a sensible default.
        let repository_query = if config.repository_query.is_empty() {
            if is_public_cloud {
                vec![strategies::AFFILIATED.to_string()]
            } else {
                vec![
                    strategies::PUBLIC.to_string(),
                    strategies::AFFILIATED.to_string(),
                ]
            }
        } else {
            config.repository_query.clone()
        };

        let path_pattern = config
            .repository_path_pattern
            .clone()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_PATH_PATTERN.to_string());

        Self {
            identity_url,
            api_endpoint,
            original_hostname,
            is_public_cloud,
            token: config.token().map(str::to_string),
            repository_query,
            path_pattern,
            explicit_repos: config.repos.clone(),
            initial_enablement: config.initial_repository_enablement,
            clone_url_style: config.git_url_type,
            api,
        }
    }

    /// Normalized identity URL, e.g. `https://ghe.example.com`.
    pub fn identity_url(&self) -> &str {
        &self.identity_url
    }

    pub fn api_endpoint(&self) -> &str {
        &self.api_endpoint
    }

    /// Hostname of the configured URL (no port). For the public cloud this is
    /// `github.com`, not the API host.
    pub fn original_hostname(&self) -> &str {
        &self.original_hostname
    }

    pub fn is_public_cloud(&self) -> bool {
        self.is_public_cloud
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Effective enumeration strategies, defaults applied.
    pub fn repository_query(&self) -> &[String] {
        &self.repository_query
    }

    pub fn path_pattern(&self) -> &str {
        &self.path_pattern
    }

    pub fn explicit_repos(&self) -> &[String] {
        &self.explicit_repos
    }

    pub fn initial_enablement(&self) -> bool {
        self.initial_enablement
    }

    pub fn clone_url_style(&self) -> CloneUrlStyle {
        self.clone_url_style
    }

    pub fn api(&self) -> &Arc<dyn RepositoryApi> {
        &self.api
    }

    /// Local URI for a repository: `{host}` and `{nameWithOwner}` substituted
    /// into the path pattern.
    pub fn repo_uri(&self, repo: &RemoteRepository) -> String {
        self.path_pattern
            .replace("{host}", &self.original_hostname)
            .replace("{nameWithOwner}", &repo.name_with_owner)
    }

    pub fn external_repo_spec(&self, repo: &RemoteRepository) -> ExternalRepoSpec {
        ExternalRepoSpec {
            id: repo.id.clone(),
            service_type: SERVICE_TYPE.to_string(),
            service_id: self.identity_url.clone(),
        }
    }

    /// Clone URL handed to the catalog.
    ///
    /// SSH style yields `git@host:owner/name.git`. Otherwise the API-provided
    /// URL is used, with the token as userinfo when one is configured.
    pub fn authenticated_clone_url(&self, repo: &RemoteRepository) -> String {
        if self.clone_url_style == CloneUrlStyle::Ssh {
            return format!("git@{}:{}.git", self.original_hostname, repo.name_with_owner);
        }

        let Some(token) = &self.token else {
            return repo.url.clone();
        };

        let mut url = match Url::parse(&repo.url) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(
                    url = %repo.url,
                    error = %e,
                    "Cannot add credentials to repository clone URL"
                );
                return repo.url.clone();
            }
        };
        if url.set_username(token).is_err() {
            tracing::warn!(url = %repo.url, "Cannot add credentials to repository clone URL");
            return repo.url.clone();
        }
        url.to_string()
    }
}

/// API root for an instance: the well-known API host for the public cloud,
/// otherwise `{base}/api` unless the configured URL already has a path.
fn derive_api_endpoint(base: &Url, is_public_cloud: bool) -> String {
    if is_public_cloud {
        return PUBLIC_CLOUD_API.to_string();
    }
    let identity = identity_string(base);
    if base.path().is_empty() || base.path() == "/" {
        format!("{identity}/api")
    } else {
        identity
    }
}
