//! Catalog task: hands create-or-update requests to a [`CatalogWriter`].
//!
//! Sync workers send [`RepoCreateOrUpdateRequest`]s into one channel; a single
//! task drains it and calls the writer for each request.
//!
//! ```text
//! workers → catalog_tx channel → catalog task → CatalogWriter
//! ```
//!
//! Write failures are accumulated rather than aborting the task, so one bad
//! record never stalls the pipeline. On shutdown the task writes whatever is
//! already buffered in the channel and exits.
//!
//! # Example
//!
//! ```ignore
//! use forgesync::sync::{create_catalog_channel, spawn_catalog_task, await_catalog_task};
//!
//! let (tx, rx) = create_catalog_channel();
//! let (handle, written) = spawn_catalog_task(writer, rx, shutdown.clone());
//!
//! // Hand tx to the supervisor...
//! drop(tx);
//!
//! let result = await_catalog_task(handle).await;
//! println!("Wrote {} records", result.written);
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::types::RepoCreateOrUpdateRequest;

/// Channel buffer size between sync workers and the catalog task.
pub const CATALOG_CHANNEL_BUFFER_SIZE: usize = 500;

/// Maximum time to wait for the catalog task after all senders are dropped.
/// Exceeding it means a sender leaked somewhere.
pub const CATALOG_TASK_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from a catalog writer.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog rejected {uri}: {message}")]
    Rejected { uri: String, message: String },

    #[error("catalog I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode catalog record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Durable store of repository records.
#[async_trait]
pub trait CatalogWriter: Send + Sync {
    /// Create the record for `request.uri` or update the existing one.
    async fn create_or_update(&self, request: &RepoCreateOrUpdateRequest) -> Result<(), CatalogError>;
}

/// Result of a catalog task.
#[derive(Debug, Default)]
#[must_use = "CatalogTaskResult may contain errors that should be checked"]
pub struct CatalogTaskResult {
    /// Requests the writer accepted.
    pub written: usize,
    /// Accumulated errors: (uri, error_message).
    pub errors: Vec<(String, String)>,
    /// Panic message if the task panicked.
    pub panic_info: Option<String>,
}

impl CatalogTaskResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty() || self.panic_info.is_some()
    }

    pub fn failed_count(&self) -> usize {
        self.errors.len() + usize::from(self.panic_info.is_some())
    }
}

async fn write_one(
    writer: &dyn CatalogWriter,
    request: RepoCreateOrUpdateRequest,
    result: &mut CatalogTaskResult,
    written: &AtomicUsize,
) {
    match writer.create_or_update(&request).await {
        Ok(()) => {
            result.written += 1;
            written.fetch_add(1, Ordering::Relaxed);
        }
        Err(e) => {
            tracing::warn!(uri = %request.uri, error = %e, "Failed to write catalog record");
            result.errors.push((request.uri, e.to_string()));
        }
    }
}

/// Spawn the task that feeds requests from `rx` to `writer`.
///
/// The task ends when every sender is dropped, or when `shutdown` fires, in
/// which case requests already in the channel are still written. Returns the
/// handle and a live counter of written records.
pub fn spawn_catalog_task(
    writer: Arc<dyn CatalogWriter>,
    mut rx: mpsc::Receiver<RepoCreateOrUpdateRequest>,
    shutdown: CancellationToken,
) -> (
    tokio::task::JoinHandle<CatalogTaskResult>,
    Arc<AtomicUsize>,
) {
    let written = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&written);

    let handle = tokio::spawn(async move {
        let mut result = CatalogTaskResult::default();
        let start = std::time::Instant::now();

        tracing::debug!("Catalog task started");

        loop {
            tokio::select! {
                biased;

                item = rx.recv() => match item {
                    Some(request) => write_one(writer.as_ref(), request, &mut result, &written).await,
                    None => {
                        tracing::debug!("Catalog channel closed");
                        break;
                    }
                },

                _ = shutdown.cancelled() => {
                    rx.close();
                    let mut drained = 0usize;
                    while let Ok(request) = rx.try_recv() {
                        write_one(writer.as_ref(), request, &mut result, &written).await;
                        drained += 1;
                    }
                    tracing::debug!(drained, "Shutdown requested, wrote buffered requests");
                    break;
                }
            }
        }

        tracing::debug!(
            written = result.written,
            errors = result.errors.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Catalog task completed"
        );
        result
    });

    (handle, counter)
}

/// Await the catalog task with a timeout, capturing any panic.
pub async fn await_catalog_task(
    mut handle: tokio::task::JoinHandle<CatalogTaskResult>,
) -> CatalogTaskResult {
    tokio::select! {
        joined = &mut handle => match joined {
            Ok(result) => result,
            Err(e) => {
                let panic_info = if e.is_panic() {
                    let payload = e.into_panic();
                    if let Some(s) = payload.downcast_ref::<&str>() {
                        (*s).to_string()
                    } else if let Some(s) = payload.downcast_ref::<String>() {
                        s.clone()
                    } else {
                        "Unknown panic".to_string()
                    }
                } else if e.is_cancelled() {
                    "Task was cancelled".to_string()
                } else {
                    format!("Task failed: {e}")
                };

                tracing::error!(panic_info = %panic_info, "Catalog task failed");
                CatalogTaskResult {
                    panic_info: Some(panic_info),
                    ..CatalogTaskResult::default()
                }
            }
        },
        _ = tokio::time::sleep(CATALOG_TASK_TIMEOUT) => {
            handle.abort();
            let cancelled = tokio::time::timeout(Duration::from_secs(1), &mut handle)
                .await
                .is_ok();

            tracing::error!(
                timeout_secs = CATALOG_TASK_TIMEOUT.as_secs(),
                cancelled,
                "Catalog task timed out, a sender was probably never dropped"
            );
            CatalogTaskResult {
                panic_info: Some(format!(
                    "Catalog task timed out after {}s",
                    CATALOG_TASK_TIMEOUT.as_secs()
                )),
                ..CatalogTaskResult::default()
            }
        }
    }
}

/// Create a channel pair sized for the catalog pipeline.
pub fn create_catalog_channel() -> (
    mpsc::Sender<RepoCreateOrUpdateRequest>,
    mpsc::Receiver<RepoCreateOrUpdateRequest>,
) {
    mpsc::channel(CATALOG_CHANNEL_BUFFER_SIZE)
}
