use async_trait::async_trait;

use super::errors::Result;
use super::rate_limit::{RateLimitMonitor, RateLimitSnapshot};

/// Maximum page size accepted by the GraphQL `first` argument.
pub const MAX_PAGE_SIZE: usize = 100;

/// A repository as reported by the code host.
///
/// Values are transient: produced by enumeration or a lookup and consumed
/// by the catalog pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRepository {
    /// Opaque, stable service ID (GraphQL node ID).
    pub id: String,
    /// Numeric database ID, used as the `since` cursor for public listing.
    pub database_id: i64,
    /// `owner/name`.
    pub name_with_owner: String,
    /// Repository description (empty when unset).
    pub description: String,
    /// Whether the repository is a fork.
    pub is_fork: bool,
    /// Canonical web/clone URL, e.g. `https://github.com/owner/name`.
    pub url: String,
}

impl RemoteRepository {
    /// The owner part of `name_with_owner`.
    pub fn owner(&self) -> &str {
        self.name_with_owner
            .split_once('/')
            .map(|(owner, _)| owner)
            .unwrap_or(&self.name_with_owner)
    }

    /// The name part of `name_with_owner`.
    pub fn name(&self) -> &str {
        self.name_with_owner
            .split_once('/')
            .map(|(_, name)| name)
            .unwrap_or(&self.name_with_owner)
    }
}

/// One page of repositories visible to the authenticated viewer.
#[derive(Debug, Clone, Default)]
pub struct ViewerRepositoriesPage {
    pub repos: Vec<RemoteRepository>,
    /// Continuation cursor; `None` when this was the last page.
    pub end_cursor: Option<String>,
    /// Rate limit cost the API charged for this page.
    pub cost: u32,
}

/// Typed operations the sync engine needs from a code host API.
///
/// Every implementation owns a [`RateLimitMonitor`] that it updates after
/// each call, so callers can read the current quota without issuing a request.
#[async_trait]
pub trait RepositoryApi: Send + Sync {
    /// Get a single repository by owner and name.
    async fn get_repository(&self, owner: &str, name: &str) -> Result<RemoteRepository>;

    /// Get a single repository by its opaque service ID.
    async fn get_repository_by_node_id(&self, id: &str) -> Result<RemoteRepository>;

    /// List all public repositories with a database ID greater than `since_id`.
    async fn list_public_repositories(&self, since_id: i64) -> Result<Vec<RemoteRepository>>;

    /// List repositories the credential owns, collaborates on, or can see
    /// through organization membership.
    async fn list_viewer_repositories(
        &self,
        first: usize,
        after: Option<&str>,
    ) -> Result<ViewerRepositoriesPage>;

    /// The quota monitor for this client's REST calls.
    fn rate_limit(&self) -> &RateLimitMonitor;

    /// The quota monitor for GraphQL calls, metered separately on GitHub.
    ///
    /// Defaults to [`rate_limit`](Self::rate_limit) for hosts with one quota.
    fn graphql_rate_limit(&self) -> &RateLimitMonitor {
        self.rate_limit()
    }

    /// Ask the host for the current quota and return the updated snapshot.
    ///
    /// The default returns what the monitor already knows.
    async fn refresh_rate_limit(&self) -> Result<RateLimitSnapshot> {
        Ok(self.rate_limit().get())
    }
}
