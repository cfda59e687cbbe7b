//! GitHub API client over an [`HttpTransport`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;

use super::convert::{from_graphql, from_rest};
use super::types::{
    GraphQlError, GraphQlRequest, GraphQlResponse, NodeData, RateLimitBody, RestErrorBody,
    RestRepository, ViewerRepositoriesData,
};
use crate::http::{HttpRequest, HttpResponse, HttpTransport};
use crate::platform::{
    self, ApiRateLimiter, EtagCache, FetchResult, MAX_PAGE_SIZE, PlatformError,
    RateLimitMonitor, RateLimitSnapshot, RemoteRepository, RepositoryApi, ViewerRepositoriesPage,
};
use crate::retry::{RetryConfig, with_retry};

const USER_AGENT: &str = concat!("forgesync/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "application/vnd.github+json";

const VIEWER_REPOSITORIES_QUERY: &str = r#"
query ViewerRepositories($first: Int!, $after: String) {
  viewer {
    repositories(first: $first, after: $after, affiliations: [OWNER, COLLABORATOR, ORGANIZATION_MEMBER]) {
      nodes { id databaseId nameWithOwner description isFork url }
      pageInfo { hasNextPage endCursor }
    }
  }
  rateLimit { cost }
}
"#;

const NODE_QUERY: &str = r#"
query Repository($id: ID!) {
  node(id: $id) {
    ... on Repository { id databaseId nameWithOwner description isFork url }
  }
}
"#;

/// REST and GraphQL base URLs for one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    pub rest_base: String,
    pub graphql: String,
}

impl ApiEndpoints {
    /// Derive endpoints from an API root.
    ///
    /// The public cloud serves REST at the root; Enterprise instances serve it
    /// under `/v3`. GraphQL is `{root}/graphql` on both.
    pub fn new(api_endpoint: &str, public_cloud: bool) -> Self {
        let root = api_endpoint.trim_end_matches('/');
        let rest_base = if public_cloud {
            root.to_string()
        } else {
            format!("{root}/v3")
        };
        Self {
            rest_base,
            graphql: format!("{root}/graphql"),
        }
    }
}

/// GitHub client implementing [`RepositoryApi`].
///
/// REST responses update the core [`RateLimitMonitor`]; GraphQL responses
/// update a separate one, since GitHub meters the two APIs independently.
/// REST GETs are conditional: a cached `ETag` is sent as `If-None-Match` and a
/// `304` is answered from the cache. Transient failures are retried according
/// to the client's [`RetryConfig`].
#[derive(Clone)]
pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    endpoints: ApiEndpoints,
    token: Option<Arc<String>>,
    rate_limiter: Option<ApiRateLimiter>,
    retry: RetryConfig,
    rate_limit: Arc<RateLimitMonitor>,
    graphql_rate_limit: Arc<RateLimitMonitor>,
    etags: Arc<EtagCache>,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("endpoints", &self.endpoints)
            .field("authenticated", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

impl GitHubClient {
    /// Create a client. No request is sent until the first API call.
    pub fn new(
        endpoints: ApiEndpoints,
        token: Option<String>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            transport,
            endpoints,
            token: token.filter(|t| !t.is_empty()).map(Arc::new),
            rate_limiter: None,
            retry: RetryConfig::default(),
            rate_limit: Arc::new(RateLimitMonitor::new()),
            graphql_rate_limit: Arc::new(RateLimitMonitor::new()),
            etags: Arc::new(EtagCache::default()),
        }
    }

    /// Pace every request through a proactive rate limiter.
    #[must_use]
    pub fn with_rate_limiter(mut self, rate_limiter: Option<ApiRateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the response cache; capacity 0 disables conditional requests.
    #[must_use]
    pub fn with_etag_cache(mut self, capacity: usize) -> Self {
        self.etags = Arc::new(EtagCache::new(capacity));
        self
    }

    pub fn endpoints(&self) -> &ApiEndpoints {
        &self.endpoints
    }

    fn authorize(&self, request: HttpRequest) -> HttpRequest {
        let request = request
            .header("Accept", ACCEPT)
            .header("User-Agent", USER_AGENT);
        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }

    async fn send_once(
        &self,
        request: HttpRequest,
        resource: &str,
        monitor: &RateLimitMonitor,
    ) -> platform::Result<HttpResponse> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.wait().await;
        }

        let response = self.transport.send(request).await?;
        monitor.update_from_headers(&response.headers);

        if (200..300).contains(&response.status) || response.status == 304 {
            Ok(response)
        } else {
            Err(status_error(&response, resource, monitor))
        }
    }

    async fn execute(
        &self,
        request: HttpRequest,
        resource: &str,
        monitor: &RateLimitMonitor,
    ) -> platform::Result<HttpResponse> {
        let label = format!("{} {}", request.method.as_str(), request.url);
        with_retry(
            || self.send_once(request.clone(), resource, monitor),
            &self.retry,
            |e: &PlatformError| e.is_transient(),
            &label,
        )
        .await
    }

    /// GET `url`, revalidating any cached copy with `If-None-Match`.
    async fn fetch_conditional(
        &self,
        url: &str,
        cached_etag: Option<&str>,
        resource: &str,
    ) -> platform::Result<FetchResult<Vec<u8>>> {
        let mut request = self.authorize(HttpRequest::get(url));
        if let Some(etag) = cached_etag {
            request = request.header("If-None-Match", etag);
        }

        let response = self.execute(request, resource, &self.rate_limit).await?;
        if response.status == 304 {
            return Ok(FetchResult::NotModified);
        }
        let etag = response.header("etag").map(str::to_string);
        Ok(FetchResult::Fetched {
            data: response.body,
            etag,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String, resource: &str) -> platform::Result<T> {
        let cached = self.etags.get(&url);
        let fetched = self
            .fetch_conditional(&url, cached.as_ref().map(|c| c.etag.as_str()), resource)
            .await;

        let body = match fetched {
            Ok(FetchResult::NotModified) => match cached {
                Some(cached) => {
                    tracing::debug!(url = %url, "Not modified, serving cached response");
                    cached.body
                }
                None => {
                    return Err(PlatformError::decode(format!(
                        "304 Not Modified for uncached {url}"
                    )));
                }
            },
            Ok(FetchResult::Fetched { data, etag }) => {
                match etag {
                    Some(etag) => self.etags.insert(url, etag, data.clone()),
                    None => self.etags.remove(&url),
                }
                data
            }
            Err(e) => {
                if e.is_not_found() {
                    self.etags.remove(&url);
                }
                return Err(e);
            }
        };
        decode(&body)
    }

    /// POST a GraphQL query. GraphQL requires authentication on GitHub, so
    /// unauthenticated clients fail without sending anything.
    async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
        resource: &str,
    ) -> platform::Result<T> {
        if self.token.is_none() {
            return Err(PlatformError::AuthRequired);
        }

        let body = serde_json::to_vec(&GraphQlRequest { query, variables })
            .map_err(|e| PlatformError::internal(e.to_string()))?;
        let request = HttpRequest::post(self.endpoints.graphql.clone(), body)
            .header("Content-Type", "application/json");
        let response = self
            .execute(self.authorize(request), resource, &self.graphql_rate_limit)
            .await?;

        let envelope: GraphQlResponse<T> = decode(&response.body)?;
        if !envelope.errors.is_empty() {
            if envelope.errors.iter().any(GraphQlError::is_not_found) {
                return Err(PlatformError::not_found(resource));
            }
            let message = envelope
                .errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(PlatformError::api(response.status, message));
        }

        envelope
            .data
            .ok_or_else(|| PlatformError::decode("GraphQL response carried no data"))
    }
}

fn status_error(response: &HttpResponse, resource: &str, monitor: &RateLimitMonitor) -> PlatformError {
    let quota_exhausted = response
        .header("x-ratelimit-remaining")
        .is_some_and(|v| v.trim() == "0");

    match response.status {
        401 => PlatformError::AuthRequired,
        404 => PlatformError::not_found(resource),
        403 | 429 if quota_exhausted => PlatformError::RateLimited {
            reset_at: monitor.get().reset_at,
        },
        status => {
            let message = serde_json::from_slice::<RestErrorBody>(&response.body)
                .map(|body| body.message)
                .unwrap_or_default();
            PlatformError::api(status, message)
        }
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> platform::Result<T> {
    serde_json::from_slice(body).map_err(|e| PlatformError::decode(e.to_string()))
}

#[async_trait]
impl RepositoryApi for GitHubClient {
    async fn get_repository(&self, owner: &str, name: &str) -> platform::Result<RemoteRepository> {
        let url = format!("{}/repos/{owner}/{name}", self.endpoints.rest_base);
        let repo: RestRepository = self.get_json(url, &format!("{owner}/{name}")).await?;
        Ok(from_rest(repo))
    }

    async fn get_repository_by_node_id(&self, id: &str) -> platform::Result<RemoteRepository> {
        let data: NodeData = self
            .graphql(NODE_QUERY, json!({ "id": id }), &format!("node {id}"))
            .await?;
        data.node
            .map(from_graphql)
            .ok_or_else(|| PlatformError::not_found(format!("node {id}")))
    }

    async fn list_public_repositories(
        &self,
        since_id: i64,
    ) -> platform::Result<Vec<RemoteRepository>> {
        let url = format!("{}/repositories?since={since_id}", self.endpoints.rest_base);
        let repos: Vec<RestRepository> = self.get_json(url, "public repositories").await?;
        Ok(repos.into_iter().map(from_rest).collect())
    }

    async fn list_viewer_repositories(
        &self,
        first: usize,
        after: Option<&str>,
    ) -> platform::Result<ViewerRepositoriesPage> {
        let variables = json!({
            "first": first.clamp(1, MAX_PAGE_SIZE),
            "after": after,
        });
        let data: ViewerRepositoriesData = self
            .graphql(VIEWER_REPOSITORIES_QUERY, variables, "viewer repositories")
            .await?;

        let connection = data.viewer.repositories;
        let end_cursor = if connection.page_info.has_next_page {
            connection.page_info.end_cursor
        } else {
            None
        };

        Ok(ViewerRepositoriesPage {
            repos: connection
                .nodes
                .into_iter()
                .flatten()
                .map(from_graphql)
                .collect(),
            end_cursor,
            cost: data.rate_limit.map(|r| r.cost).unwrap_or(1),
        })
    }

    fn rate_limit(&self) -> &RateLimitMonitor {
        &self.rate_limit
    }

    fn graphql_rate_limit(&self) -> &RateLimitMonitor {
        &self.graphql_rate_limit
    }

    /// `GET /rate_limit` does not count against the quota. Its headers carry
    /// the core limit and its body the GraphQL one. Never served from cache.
    async fn refresh_rate_limit(&self) -> platform::Result<RateLimitSnapshot> {
        let url = format!("{}/rate_limit", self.endpoints.rest_base);
        let response = self
            .execute(self.authorize(HttpRequest::get(url)), "rate limit", &self.rate_limit)
            .await?;

        let body: RateLimitBody = decode(&response.body)?;
        if let Some(graphql) = body.resources.graphql
            && let Some(reset_at) = chrono::DateTime::from_timestamp(graphql.reset, 0)
        {
            self.graphql_rate_limit
                .update(RateLimitSnapshot::known(graphql.remaining, reset_at));
        }
        Ok(self.rate_limit.get())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::http::{HttpMethod, MockTransport, header_get};

    const GHE_REST: &str = "https://ghe.example.com/api/v3";
    const GHE_GRAPHQL: &str = "https://ghe.example.com/api/graphql";

    fn client(mock: &MockTransport, token: Option<&str>) -> GitHubClient {
        GitHubClient::new(
            ApiEndpoints::new("https://ghe.example.com/api", false),
            token.map(str::to_string),
            Arc::new(mock.clone()),
        )
        .with_retry(RetryConfig::new(Duration::from_millis(1), Duration::from_millis(2), 3))
    }

    fn rest_repo(id: i64, full_name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "node_id": format!("R_{id}"),
            "full_name": full_name,
            "description": null,
            "fork": false,
            "html_url": format!("https://ghe.example.com/{full_name}"),
        })
    }

    #[test]
    fn test_api_endpoints() {
        let public = ApiEndpoints::new("https://api.github.com", true);
        assert_eq!(public.rest_base, "https://api.github.com");
        assert_eq!(public.graphql, "https://api.github.com/graphql");

        let enterprise = ApiEndpoints::new("https://ghe.example.com/api/", false);
        assert_eq!(enterprise.rest_base, GHE_REST);
        assert_eq!(enterprise.graphql, GHE_GRAPHQL);
    }

    #[tokio::test]
    async fn test_get_repository_updates_rate_limit() {
        let mock = MockTransport::new();
        mock.push_json(
            HttpMethod::Get,
            format!("{GHE_REST}/repos/acme/widgets"),
            200,
            &[
                ("X-RateLimit-Remaining", "4999"),
                ("X-RateLimit-Reset", "1700000000"),
            ],
            rest_repo(42, "acme/widgets"),
        );

        let client = client(&mock, Some("s3cret"));
        assert!(!client.rate_limit().get().known);

        let repo = client.get_repository("acme", "widgets").await.unwrap();
        assert_eq!(repo.id, "R_42");
        assert_eq!(repo.name_with_owner, "acme/widgets");

        let snapshot = client.rate_limit().get();
        assert!(snapshot.known);
        assert_eq!(snapshot.remaining, 4999);

        let requests = mock.requests();
        assert_eq!(
            header_get(&requests[0].headers, "authorization"),
            Some("Bearer s3cret")
        );
    }

    #[tokio::test]
    async fn test_get_repository_not_found_is_not_retried() {
        let mock = MockTransport::new();
        mock.push_json(
            HttpMethod::Get,
            format!("{GHE_REST}/repos/acme/missing"),
            404,
            &[],
            json!({ "message": "Not Found" }),
        );

        let err = client(&mock, None)
            .get_repository("acme", "missing")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(mock.requests().len(), 1);
        assert_eq!(header_get(&mock.requests()[0].headers, "authorization"), None);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let mock = MockTransport::new();
        let url = format!("{GHE_REST}/repos/acme/widgets");
        mock.push_failure(HttpMethod::Get, url.clone(), "connection reset");
        mock.push_json(HttpMethod::Get, url.clone(), 502, &[], json!({ "message": "Bad Gateway" }));
        mock.push_json(HttpMethod::Get, url, 200, &[], rest_repo(42, "acme/widgets"));

        let repo = client(&mock, None)
            .get_repository("acme", "widgets")
            .await
            .unwrap();
        assert_eq!(repo.database_id, 42);
        assert_eq!(mock.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_quota_maps_to_rate_limited() {
        let mock = MockTransport::new();
        mock.push_json(
            HttpMethod::Get,
            format!("{GHE_REST}/repos/acme/widgets"),
            403,
            &[
                ("X-RateLimit-Remaining", "0"),
                ("X-RateLimit-Reset", "1700000000"),
            ],
            json!({ "message": "API rate limit exceeded" }),
        );

        let err = client(&mock, Some("t"))
            .get_repository("acme", "widgets")
            .await
            .unwrap_err();
        match err {
            PlatformError::RateLimited { reset_at } => {
                assert_eq!(reset_at.timestamp(), 1_700_000_000);
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_forbidden_with_quota_left_is_api_error() {
        let mock = MockTransport::new();
        mock.push_json(
            HttpMethod::Get,
            format!("{GHE_REST}/repos/acme/widgets"),
            403,
            &[("X-RateLimit-Remaining", "12")],
            json!({ "message": "Resource not accessible" }),
        );

        let err = client(&mock, Some("t"))
            .get_repository("acme", "widgets")
            .await
            .unwrap_err();
        assert!(matches!(err, PlatformError::Api { status: 403, ref message } if message == "Resource not accessible"));
    }

    #[tokio::test]
    async fn test_list_public_repositories() {
        let mock = MockTransport::new();
        mock.push_json(
            HttpMethod::Get,
            format!("{GHE_REST}/repositories?since=7"),
            200,
            &[],
            json!([rest_repo(8, "a/one"), rest_repo(11, "b/two")]),
        );

        let repos = client(&mock, None).list_public_repositories(7).await.unwrap();
        let ids: Vec<i64> = repos.iter().map(|r| r.database_id).collect();
        assert_eq!(ids, vec![8, 11]);
    }

    #[tokio::test]
    async fn test_list_viewer_repositories_pages() {
        let mock = MockTransport::new();
        mock.push_json(
            HttpMethod::Post,
            GHE_GRAPHQL,
            200,
            &[],
            json!({
                "data": {
                    "viewer": { "repositories": {
                        "nodes": [
                            { "id": "R_1", "databaseId": 1, "nameWithOwner": "acme/widgets",
                              "description": "Widgets", "isFork": false,
                              "url": "https://ghe.example.com/acme/widgets" },
                            null
                        ],
                        "pageInfo": { "hasNextPage": true, "endCursor": "Y3Vyc29yOjE=" }
                    }},
                    "rateLimit": { "cost": 3 }
                }
            }),
        );
        mock.push_json(
            HttpMethod::Post,
            GHE_GRAPHQL,
            200,
            &[],
            json!({
                "data": {
                    "viewer": { "repositories": {
                        "nodes": [],
                        "pageInfo": { "hasNextPage": false, "endCursor": "Y3Vyc29yOjE=" }
                    }}
                }
            }),
        );

        let client = client(&mock, Some("t"));
        let first = client.list_viewer_repositories(500, None).await.unwrap();
        assert_eq!(first.repos.len(), 1);
        assert_eq!(first.cost, 3);
        assert_eq!(first.end_cursor.as_deref(), Some("Y3Vyc29yOjE="));

        let second = client
            .list_viewer_repositories(100, first.end_cursor.as_deref())
            .await
            .unwrap();
        assert!(second.repos.is_empty());
        assert_eq!(second.end_cursor, None);
        assert_eq!(second.cost, 1);

        let body: serde_json::Value =
            serde_json::from_slice(&mock.requests()[0].body).unwrap();
        assert_eq!(body["variables"]["first"], 100);
        assert!(body["variables"]["after"].is_null());
    }

    #[tokio::test]
    async fn test_graphql_requires_token() {
        let mock = MockTransport::new();
        let err = client(&mock, None)
            .list_viewer_repositories(100, None)
            .await
            .unwrap_err();
        assert!(matches!(err, PlatformError::AuthRequired));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_get_repository_by_node_id() {
        let mock = MockTransport::new();
        mock.push_json(
            HttpMethod::Post,
            GHE_GRAPHQL,
            200,
            &[],
            json!({ "data": { "node": {
                "id": "R_9", "databaseId": 9, "nameWithOwner": "acme/gadgets",
                "description": null, "isFork": true, "url": "https://ghe.example.com/acme/gadgets"
            }}}),
        );
        mock.push_json(HttpMethod::Post, GHE_GRAPHQL, 200, &[], json!({ "data": { "node": null } }));
        mock.push_json(
            HttpMethod::Post,
            GHE_GRAPHQL,
            200,
            &[],
            json!({ "data": null, "errors": [
                { "type": "NOT_FOUND", "message": "Could not resolve to a node with the global id of 'R_x'" }
            ]}),
        );

        let client = client(&mock, Some("t"));
        let repo = client.get_repository_by_node_id("R_9").await.unwrap();
        assert!(repo.is_fork);
        assert_eq!(repo.description, "");

        assert!(client.get_repository_by_node_id("R_0").await.unwrap_err().is_not_found());
        assert!(client.get_repository_by_node_id("R_x").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_refresh_rate_limit() {
        let mock = MockTransport::new();
        mock.push_json(
            HttpMethod::Get,
            format!("{GHE_REST}/rate_limit"),
            200,
            &[
                ("X-RateLimit-Remaining", "4321"),
                ("X-RateLimit-Reset", "1700000000"),
            ],
            json!({ "resources": {} }),
        );

        let snapshot = client(&mock, None).refresh_rate_limit().await.unwrap();
        assert!(snapshot.known);
        assert_eq!(snapshot.remaining, 4321);
        assert_eq!(snapshot.reset_at.timestamp(), 1_700_000_000);
    }

    #[tokio::test]
    async fn test_repeat_get_is_conditional_and_served_from_cache() {
        let mock = MockTransport::new();
        let url = format!("{GHE_REST}/repos/acme/widgets");
        mock.push_json(
            HttpMethod::Get,
            url.clone(),
            200,
            &[
                ("ETag", "\"abc\""),
                ("X-RateLimit-Remaining", "100"),
                ("X-RateLimit-Reset", "1700000000"),
            ],
            rest_repo(42, "acme/widgets"),
        );
        mock.push_response(
            HttpMethod::Get,
            url.clone(),
            HttpResponse {
                status: 304,
                headers: vec![
                    ("X-RateLimit-Remaining".to_string(), "100".to_string()),
                    ("X-RateLimit-Reset".to_string(), "1700000000".to_string()),
                ],
                body: Vec::new(),
            },
        );

        let client = client(&mock, Some("t"));
        let first = client.get_repository("acme", "widgets").await.unwrap();
        let second = client.get_repository("acme", "widgets").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(second.name_with_owner, "acme/widgets");

        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(header_get(&requests[0].headers, "if-none-match"), None);
        assert_eq!(header_get(&requests[1].headers, "if-none-match"), Some("\"abc\""));
        assert_eq!(client.rate_limit().get().remaining, 100);
    }

    #[tokio::test]
    async fn test_response_without_etag_is_not_cached() {
        let mock = MockTransport::new();
        let url = format!("{GHE_REST}/repos/acme/widgets");
        mock.push_json(HttpMethod::Get, url.clone(), 200, &[], rest_repo(42, "acme/widgets"));
        mock.push_json(HttpMethod::Get, url, 200, &[], rest_repo(42, "acme/widgets"));

        let client = client(&mock, None);
        client.get_repository("acme", "widgets").await.unwrap();
        client.get_repository("acme", "widgets").await.unwrap();

        assert_eq!(header_get(&mock.requests()[1].headers, "if-none-match"), None);
    }

    #[tokio::test]
    async fn test_disabled_cache_sends_unconditional_requests() {
        let mock = MockTransport::new();
        let url = format!("{GHE_REST}/repos/acme/widgets");
        for _ in 0..2 {
            mock.push_json(
                HttpMethod::Get,
                url.clone(),
                200,
                &[("ETag", "\"abc\"")],
                rest_repo(42, "acme/widgets"),
            );
        }

        let client = client(&mock, None).with_etag_cache(0);
        client.get_repository("acme", "widgets").await.unwrap();
        client.get_repository("acme", "widgets").await.unwrap();

        assert_eq!(header_get(&mock.requests()[1].headers, "if-none-match"), None);
    }

    #[tokio::test]
    async fn test_graphql_quota_is_tracked_separately() {
        let mock = MockTransport::new();
        mock.push_json(
            HttpMethod::Get,
            format!("{GHE_REST}/repos/acme/widgets"),
            200,
            &[
                ("X-RateLimit-Remaining", "4000"),
                ("X-RateLimit-Reset", "1700000000"),
            ],
            rest_repo(42, "acme/widgets"),
        );
        mock.push_json(
            HttpMethod::Post,
            GHE_GRAPHQL,
            200,
            &[
                ("X-RateLimit-Remaining", "12"),
                ("X-RateLimit-Reset", "1700000600"),
            ],
            json!({ "data": { "node": {
                "id": "R_9", "databaseId": 9, "nameWithOwner": "acme/gadgets",
                "description": null, "isFork": false, "url": "https://ghe.example.com/acme/gadgets"
            }}}),
        );

        let client = client(&mock, Some("t"));
        client.get_repository("acme", "widgets").await.unwrap();
        client.get_repository_by_node_id("R_9").await.unwrap();

        assert_eq!(client.rate_limit().get().remaining, 4000);
        let graphql = client.graphql_rate_limit().get();
        assert!(graphql.known);
        assert_eq!(graphql.remaining, 12);
        assert_eq!(graphql.reset_at.timestamp(), 1_700_000_600);
    }

    #[tokio::test]
    async fn test_refresh_rate_limit_reads_graphql_quota() {
        let mock = MockTransport::new();
        for _ in 0..2 {
            mock.push_json(
                HttpMethod::Get,
                format!("{GHE_REST}/rate_limit"),
                200,
                &[
                    ("ETag", "\"rl\""),
                    ("X-RateLimit-Remaining", "4321"),
                    ("X-RateLimit-Reset", "1700000000"),
                ],
                json!({ "resources": {
                    "core": { "remaining": 4321, "reset": 1700000000 },
                    "graphql": { "remaining": 4999, "reset": 1700000900 }
                }}),
            );
        }

        let client = client(&mock, Some("t"));
        let snapshot = client.refresh_rate_limit().await.unwrap();
        assert_eq!(snapshot.remaining, 4321);

        let graphql = client.graphql_rate_limit().get();
        assert_eq!(graphql.remaining, 4999);
        assert_eq!(graphql.reset_at.timestamp(), 1_700_000_900);

        client.refresh_rate_limit().await.unwrap();
        assert_eq!(header_get(&mock.requests()[1].headers, "if-none-match"), None);
    }

    #[test]
    fn test_debug_hides_token() {
        let client = client(&MockTransport::new(), Some("s3cret"));
        let debug = format!("{client:?}");
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("authenticated: true"));
    }
}
