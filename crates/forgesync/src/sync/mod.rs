//! Continuous repository synchronization.
//!
//! # Module Structure
//!
//! - `types` - [`SyncSettings`], [`RepoCreateOrUpdateRequest`], [`SyncPassResult`], constants
//! - `enumerate` - [`enumerate()`]: per-connection strategy tasks feeding one bounded queue
//! - `dedup` - [`Dedup`], [`spawn_dedup`]: forwards each remote URL once per pass
//! - `worker` - [`run_sync_worker`]: the per-connection sync loop
//! - `supervisor` - [`SyncSupervisor`]: starts, restarts, and stops the worker set
//! - `catalog_task` - [`spawn_catalog_task`]: hands requests to a [`CatalogWriter`]
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use forgesync::connection::{ClientSettings, ConnectionRegistry};
//! use forgesync::sync::{SyncSettings, SyncSupervisor, create_catalog_channel, spawn_catalog_task};
//!
//! let registry = Arc::new(ConnectionRegistry::new(ClientSettings::default()));
//! let (tx, rx) = create_catalog_channel();
//! let (catalog, _) = spawn_catalog_task(writer, rx, shutdown.clone());
//!
//! let supervisor = SyncSupervisor::new(registry, SyncSettings::default(), tx, shutdown.clone());
//! supervisor.reconfigure(&configs).await;
//! ```

mod catalog_task;
mod dedup;
mod enumerate;
mod supervisor;
mod types;
mod wait;
mod worker;

pub use catalog_task::{
    CATALOG_CHANNEL_BUFFER_SIZE, CATALOG_TASK_TIMEOUT, CatalogError, CatalogTaskResult,
    CatalogWriter, await_catalog_task, create_catalog_channel, spawn_catalog_task,
};
pub use dedup::{Dedup, spawn_dedup};
pub use enumerate::enumerate;
pub use supervisor::SyncSupervisor;
pub use types::{
    DEFAULT_MAX_CONCURRENT_STRATEGIES, DEFAULT_QUEUE_CAPACITY, DEFAULT_RATE_LIMIT_FLOOR,
    DEFAULT_SYNC_INTERVAL, EXHAUSTION_SLACK, EnumerationSettings, RepoCreateOrUpdateRequest,
    SyncPassResult, SyncSettings,
};
pub use wait::{sleep_or_cancelled, until_cancelled};
pub use worker::{exhaustion_wait, run_sync_worker, sync_connection};
