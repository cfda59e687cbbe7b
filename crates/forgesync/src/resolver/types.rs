use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::connection::{Connection, ExternalRepoSpec};
use crate::platform::{PlatformError, RemoteRepository};

/// Environment variable forcing every lookup to bypass the API.
pub const BYPASS_API_ENV: &str = "BYPASS_GITHUB_API";

/// Environment variable holding the remaining-quota threshold for dynamic bypass.
pub const MIN_RATE_LIMIT_ENV: &str = "GITHUB_API_MIN_RATE_LIMIT";

/// What to look up. At least one field is expected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoLookupArgs {
    /// External identity of the repository.
    pub external_repo: Option<ExternalRepoSpec>,
    /// Local repository URI such as `github.com/acme/widgets`.
    pub repo: Option<String>,
}

impl RepoLookupArgs {
    pub fn by_uri(uri: impl Into<String>) -> Self {
        Self {
            repo: Some(uri.into()),
            ..Self::default()
        }
    }

    pub fn by_external(spec: ExternalRepoSpec) -> Self {
        Self {
            external_repo: Some(spec),
            ..Self::default()
        }
    }

    pub(crate) fn uri(&self) -> Option<&str> {
        self.repo.as_deref().filter(|r| !r.is_empty())
    }
}

/// A resolved repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRepo {
    pub uri: String,
    /// `None` when resolved without consulting the API.
    pub external_repo: Option<ExternalRepoSpec>,
    pub description: String,
    pub fork: bool,
    pub clone_url: String,
}

impl ResolvedRepo {
    pub fn new(conn: &Connection, repo: &RemoteRepository) -> Self {
        Self {
            uri: conn.repo_uri(repo),
            external_repo: Some(conn.external_repo_spec(repo)),
            description: repo.description.clone(),
            fork: repo.is_fork,
            clone_url: conn.authenticated_clone_url(repo),
        }
    }
}

/// Successful lookup outcome.
///
/// `Unhandled` means the repository is outside every configured connection,
/// so the caller should try another resolver. `Resolved` and every
/// [`LookupError`] are authoritative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoLookup {
    Unhandled,
    Resolved(ResolvedRepo),
}

impl RepoLookup {
    pub fn is_authoritative(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    pub fn resolved(self) -> Option<ResolvedRepo> {
        match self {
            Self::Resolved(repo) => Some(repo),
            Self::Unhandled => None,
        }
    }
}

/// Authoritative lookup failures; callers must not retry with another resolver.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The external identity names a service ID with no configured connection.
    #[error("no configured GitHub connection with URL {service_id:?}")]
    UnconfiguredConnection { service_id: String },

    /// The repository does not exist or is not accessible.
    #[error("repository not found: {repo}: {message}")]
    NotFound { repo: String, message: String },

    /// The URI does not end in `owner/name`.
    #[error("invalid repository identifier {repo:?}: expected owner/name")]
    InvalidIdentifier { repo: String },

    /// The API call failed.
    #[error("GitHub API lookup of {repo} failed: {source}")]
    Api {
        repo: String,
        #[source]
        source: PlatformError,
    },

    /// Neither argument could be used with the selected connection.
    #[error("unable to look up GitHub repository ({args})")]
    CannotResolve { args: String },
}

impl LookupError {
    pub(crate) fn from_platform(repo: &str, err: PlatformError) -> Self {
        if err.is_not_found() {
            Self::NotFound {
                repo: repo.to_string(),
                message: err.to_string(),
            }
        } else {
            Self::Api {
                repo: repo.to_string(),
                source: err,
            }
        }
    }
}

/// Lookup policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupSettings {
    /// Never call the API for unauthenticated URI lookups.
    pub bypass_api: bool,
    /// Bypass while known remaining quota is below this; `0` disables.
    pub min_rate_limit: i64,
}

impl LookupSettings {
    /// Apply [`BYPASS_API_ENV`] and [`MIN_RATE_LIMIT_ENV`] from the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(
            std::env::var(BYPASS_API_ENV).ok().as_deref(),
            std::env::var(MIN_RATE_LIMIT_ENV).ok().as_deref(),
        )
    }

    /// Apply raw override values. Unparseable values leave the setting unchanged.
    #[must_use]
    pub fn with_overrides(mut self, bypass_api: Option<&str>, min_rate_limit: Option<&str>) -> Self {
        if let Some(bypass) = bypass_api.and_then(parse_bool_flag) {
            self.bypass_api = bypass;
        }
        if let Some(min) = min_rate_limit.and_then(|v| v.trim().parse::<i64>().ok()) {
            self.min_rate_limit = min;
        }
        self
    }
}

/// Parse the boolean spellings accepted for flag environment variables.
pub fn parse_bool_flag(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}
