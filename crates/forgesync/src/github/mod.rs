//! GitHub API client for repository discovery.
//!
//! # Module Structure
//!
//! - `client` - [`GitHubClient`], REST + GraphQL client implementing [`RepositoryApi`](crate::platform::RepositoryApi)
//! - `types` - Wire types for the handful of endpoints the engine calls
//! - `convert` - Conversion to [`RemoteRepository`](crate::platform::RemoteRepository),
//!   plus [`split_name_with_owner`]
//!
//! ```ignore
//! use std::sync::Arc;
//! use forgesync::github::{ApiEndpoints, GitHubClient};
//! use forgesync::http::reqwest_transport::ReqwestTransport;
//!
//! let transport = Arc::new(ReqwestTransport::with_timeout(DEFAULT_TIMEOUT)?);
//! let client = GitHubClient::new(
//!     ApiEndpoints::new("https://api.github.com", true),
//!     Some(token),
//!     transport,
//! );
//! let repo = client.get_repository("rust-lang", "rust").await?;
//! ```

mod client;
mod convert;
mod types;

pub use client::{ApiEndpoints, GitHubClient};
pub use convert::split_name_with_owner;
