//! In-memory `RepositoryApi` for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::platform::{
    self, PlatformError, RateLimitMonitor, RemoteRepository, RepositoryApi,
    ViewerRepositoriesPage,
};

pub fn remote(host: &str, name_with_owner: &str, database_id: i64) -> RemoteRepository {
    RemoteRepository {
        id: format!("R_{database_id}"),
        database_id,
        name_with_owner: name_with_owner.to_string(),
        description: format!("{name_with_owner} description"),
        is_fork: false,
        url: format!("https://{host}/{name_with_owner}"),
    }
}

/// Scripted API: single-repository lookups answer from `repos`; list calls pop
/// scripted pages and return an empty last page once the script runs out.
#[derive(Default)]
pub struct FakeApi {
    repos: Mutex<Vec<RemoteRepository>>,
    public_pages: Mutex<VecDeque<platform::Result<Vec<RemoteRepository>>>>,
    viewer_pages: Mutex<VecDeque<platform::Result<ViewerRepositoriesPage>>>,
    calls: Mutex<Vec<String>>,
    rate_limit: RateLimitMonitor,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repo(self, repo: RemoteRepository) -> Self {
        self.repos.lock().unwrap().push(repo);
        self
    }

    pub fn with_public_page(self, page: Vec<RemoteRepository>) -> Self {
        self.public_pages.lock().unwrap().push_back(Ok(page));
        self
    }

    pub fn with_public_error(self, err: PlatformError) -> Self {
        self.public_pages.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn with_viewer_page(self, repos: Vec<RemoteRepository>, end_cursor: Option<&str>) -> Self {
        self.viewer_pages
            .lock()
            .unwrap()
            .push_back(Ok(ViewerRepositoriesPage {
                repos,
                end_cursor: end_cursor.map(str::to_string),
                cost: 1,
            }));
        self
    }

    pub fn with_viewer_error(self, err: PlatformError) -> Self {
        self.viewer_pages.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl RepositoryApi for FakeApi {
    async fn get_repository(&self, owner: &str, name: &str) -> platform::Result<RemoteRepository> {
        let name_with_owner = format!("{owner}/{name}");
        self.record(format!("get {name_with_owner}"));
        self.repos
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.name_with_owner.eq_ignore_ascii_case(&name_with_owner))
            .cloned()
            .ok_or_else(|| PlatformError::not_found(name_with_owner))
    }

    async fn get_repository_by_node_id(&self, id: &str) -> platform::Result<RemoteRepository> {
        self.record(format!("node {id}"));
        self.repos
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| PlatformError::not_found(id))
    }

    async fn list_public_repositories(
        &self,
        since_id: i64,
    ) -> platform::Result<Vec<RemoteRepository>> {
        self.record(format!("public since={since_id}"));
        self.public_pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn list_viewer_repositories(
        &self,
        first: usize,
        after: Option<&str>,
    ) -> platform::Result<ViewerRepositoriesPage> {
        self.record(format!("viewer first={first} after={}", after.unwrap_or("-")));
        self.viewer_pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ViewerRepositoriesPage::default()))
    }

    fn rate_limit(&self) -> &RateLimitMonitor {
        &self.rate_limit
    }
}
