//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use forgesync::connection::{ConfigError, ConnectionBuilder};
use forgesync::platform::{self, ViewerRepositoriesPage};
use forgesync::{
    Connection, ConnectionConfig, PlatformError, RateLimitMonitor, RemoteRepository,
    RepositoryApi,
};

/// Maximum time any sync operation should take in tests.
/// If exceeded, there's likely a hang/deadlock.
pub const SYNC_TIMEOUT: Duration = Duration::from_secs(10);

pub fn repo(host: &str, name_with_owner: &str, database_id: i64) -> RemoteRepository {
    RemoteRepository {
        id: format!("R_{database_id}"),
        database_id,
        name_with_owner: name_with_owner.to_string(),
        description: format!("About {name_with_owner}"),
        is_fork: false,
        url: format!("https://{host}/{name_with_owner}"),
    }
}

/// A code host with a fixed set of repositories. Affiliated listing pops
/// scripted pages; public listing serves `repos` in ID order.
#[derive(Default)]
pub struct StaticHost {
    repos: Vec<RemoteRepository>,
    viewer_pages: Mutex<VecDeque<ViewerRepositoriesPage>>,
    requests: Mutex<Vec<String>>,
    rate_limit: RateLimitMonitor,
}

impl StaticHost {
    pub fn new(repos: Vec<RemoteRepository>) -> Self {
        Self {
            repos,
            ..Self::default()
        }
    }

    pub fn with_viewer_page(self, repos: Vec<RemoteRepository>, end_cursor: Option<&str>) -> Self {
        self.viewer_pages
            .lock()
            .unwrap()
            .push_back(ViewerRepositoriesPage {
                repos,
                end_cursor: end_cursor.map(str::to_string),
                cost: 1,
            });
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, request: String) {
        self.requests.lock().unwrap().push(request);
    }
}

#[async_trait]
impl RepositoryApi for StaticHost {
    async fn get_repository(&self, owner: &str, name: &str) -> platform::Result<RemoteRepository> {
        let name_with_owner = format!("{owner}/{name}");
        self.record(format!("repo {name_with_owner}"));
        self.repos
            .iter()
            .find(|r| r.name_with_owner.eq_ignore_ascii_case(&name_with_owner))
            .cloned()
            .ok_or_else(|| PlatformError::not_found(name_with_owner))
    }

    async fn get_repository_by_node_id(&self, id: &str) -> platform::Result<RemoteRepository> {
        self.record(format!("node {id}"));
        self.repos
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| PlatformError::not_found(id))
    }

    async fn list_public_repositories(
        &self,
        since_id: i64,
    ) -> platform::Result<Vec<RemoteRepository>> {
        self.record(format!("public {since_id}"));
        let mut page: Vec<_> = self
            .repos
            .iter()
            .filter(|r| r.database_id > since_id)
            .cloned()
            .collect();
        page.sort_by_key(|r| r.database_id);
        page.truncate(2);
        Ok(page)
    }

    async fn list_viewer_repositories(
        &self,
        _first: usize,
        after: Option<&str>,
    ) -> platform::Result<ViewerRepositoriesPage> {
        self.record(format!("viewer {}", after.unwrap_or("-")));
        Ok(self
            .viewer_pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default())
    }

    fn rate_limit(&self) -> &RateLimitMonitor {
        &self.rate_limit
    }
}

/// Registry builder serving every connection from `api`.
pub fn builder(api: Arc<StaticHost>) -> ConnectionBuilder {
    Arc::new(
        move |config: &ConnectionConfig| -> Result<Connection, ConfigError> {
            Connection::with_api(config, Arc::clone(&api) as Arc<dyn RepositoryApi>)
        },
    )
}
