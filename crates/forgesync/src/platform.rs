//! Platform-agnostic API surface for code host clients.
//!
//! This module defines the `RepositoryApi` trait that the sync engine and the
//! resolver call, the `RemoteRepository` value they exchange, and the rate
//! limit bookkeeping every client carries.
//!
//! # Example
//!
//! ```ignore
//! use forgesync::platform::RepositoryApi;
//!
//! async fn show(api: &dyn RepositoryApi) -> forgesync::platform::Result<()> {
//!     let repo = api.get_repository("rust-lang", "rust").await?;
//!     println!("{} ({})", repo.name_with_owner, repo.url);
//!     println!("quota: {:?}", api.rate_limit().get());
//!     Ok(())
//! }
//! ```

mod conditional;
mod errors;
mod rate_limit;
mod types;

pub use conditional::{CachedResponse, DEFAULT_ETAG_CACHE_CAPACITY, EtagCache, FetchResult};
pub use errors::{PlatformError, Result};
pub use rate_limit::{ApiRateLimiter, RateLimitMonitor, RateLimitSnapshot, rate_limits};
pub use types::{MAX_PAGE_SIZE, RemoteRepository, RepositoryApi, ViewerRepositoriesPage};
