//! GitHub API wire types.
//!
//! Only the fields the sync engine reads are modelled; everything else in the
//! responses is ignored by serde.

use serde::{Deserialize, Serialize};

/// Repository object as returned by the REST API (`/repos/{owner}/{repo}`,
/// `/repositories`).
#[derive(Debug, Clone, Deserialize)]
pub struct RestRepository {
    /// Numeric database ID.
    pub id: i64,
    /// GraphQL node ID.
    pub node_id: String,
    /// `owner/name`.
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fork: bool,
    /// Web URL, which doubles as the HTTPS clone URL without `.git`.
    pub html_url: String,
}

/// Repository node as selected by the client's GraphQL queries.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRepository {
    pub id: String,
    #[serde(default)]
    pub database_id: Option<i64>,
    pub name_with_owner: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_fork: bool,
    pub url: String,
}

/// GraphQL request body.
#[derive(Debug, Serialize)]
pub struct GraphQlRequest<'a> {
    pub query: &'a str,
    pub variables: serde_json::Value,
}

/// GraphQL response envelope.
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl GraphQlError {
    pub fn is_not_found(&self) -> bool {
        self.kind.as_deref() == Some("NOT_FOUND")
    }
}

/// Cost reported by the GraphQL `rateLimit` selection.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct GraphQlRateLimit {
    #[serde(default)]
    pub cost: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub end_cursor: Option<String>,
}

/// `data` of the viewer repositories query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerRepositoriesData {
    pub viewer: Viewer,
    #[serde(default)]
    pub rate_limit: Option<GraphQlRateLimit>,
}

#[derive(Debug, Deserialize)]
pub struct Viewer {
    pub repositories: RepositoryConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryConnection {
    #[serde(default)]
    pub nodes: Vec<Option<GraphQlRepository>>,
    #[serde(default)]
    pub page_info: PageInfo,
}

/// `data` of the node lookup query.
#[derive(Debug, Deserialize)]
pub struct NodeData {
    #[serde(default)]
    pub node: Option<GraphQlRepository>,
}

/// Error body returned by the REST API on non-success statuses.
#[derive(Debug, Default, Deserialize)]
pub struct RestErrorBody {
    #[serde(default)]
    pub message: String,
}

/// Body of `GET /rate_limit`.
#[derive(Debug, Default, Deserialize)]
pub struct RateLimitBody {
    #[serde(default)]
    pub resources: RateLimitResources,
}

#[derive(Debug, Default, Deserialize)]
pub struct RateLimitResources {
    #[serde(default)]
    pub graphql: Option<RateLimitResource>,
}

/// One metered resource; `reset` is a Unix timestamp.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RateLimitResource {
    pub remaining: i64,
    pub reset: i64,
}
