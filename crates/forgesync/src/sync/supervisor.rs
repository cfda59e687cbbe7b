//! Owns the sync worker tasks.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::types::{RepoCreateOrUpdateRequest, SyncSettings};
use super::worker::run_sync_worker;
use crate::connection::{ConnectionConfig, ConnectionRegistry, ReconfigureReport};

struct WorkerSet {
    cancel: CancellationToken,
    tasks: JoinSet<()>,
    /// Dropped on shutdown so the catalog task can finish.
    catalog_tx: Option<mpsc::Sender<RepoCreateOrUpdateRequest>>,
}

/// Starts one sync worker per connection and restarts the whole set whenever
/// the configuration changes.
///
/// Workers run under child tokens of the process-wide `shutdown` token, so
/// cancelling it also stops them.
pub struct SyncSupervisor {
    registry: Arc<ConnectionRegistry>,
    settings: SyncSettings,
    shutdown: CancellationToken,
    workers: Mutex<WorkerSet>,
}

impl std::fmt::Debug for SyncSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSupervisor")
            .field("registry", &self.registry)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl SyncSupervisor {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        settings: SyncSettings,
        catalog_tx: mpsc::Sender<RepoCreateOrUpdateRequest>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            registry,
            settings,
            workers: Mutex::new(WorkerSet {
                cancel: shutdown.child_token(),
                tasks: JoinSet::new(),
                catalog_tx: Some(catalog_tx),
            }),
            shutdown,
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Rebuild the registry from `configs`, stop the running workers, and
    /// start one worker per connection in the new snapshot.
    ///
    /// Calls are serialized. After [`shutdown`](Self::shutdown) the registry is
    /// still updated but no workers are started.
    pub async fn reconfigure(&self, configs: &[ConnectionConfig]) -> ReconfigureReport {
        let mut workers = self.workers.lock().await;

        let report = self.registry.reconfigure(configs);
        stop_workers(&mut workers).await;

        let Some(catalog_tx) = workers.catalog_tx.clone() else {
            return report;
        };
        if self.shutdown.is_cancelled() {
            return report;
        }

        let cancel = self.shutdown.child_token();
        let snapshot = self.registry.snapshot();
        for conn in &snapshot.connections {
            workers.tasks.spawn(run_sync_worker(
                Arc::clone(conn),
                self.settings.clone(),
                catalog_tx.clone(),
                cancel.clone(),
            ));
        }
        workers.cancel = cancel;

        tracing::info!(
            version = snapshot.version,
            workers = workers.tasks.len(),
            "Sync workers restarted"
        );
        report
    }

    /// Number of worker tasks still running.
    pub async fn worker_count(&self) -> usize {
        let mut workers = self.workers.lock().await;
        while workers.tasks.try_join_next().is_some() {}
        workers.tasks.len()
    }

    /// Stop every worker and release the catalog sender.
    ///
    /// Returns `false` if the workers had to be aborted after `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        let mut workers = self.workers.lock().await;
        workers.catalog_tx = None;

        let clean = tokio::time::timeout(timeout, stop_workers(&mut workers))
            .await
            .is_ok();
        if !clean {
            tracing::warn!(
                timeout_secs = timeout.as_secs(),
                "Sync workers did not stop in time, aborting them"
            );
            workers.tasks.abort_all();
            while workers.tasks.join_next().await.is_some() {}
        }
        clean
    }
}

async fn stop_workers(workers: &mut WorkerSet) {
    workers.cancel.cancel();
    while let Some(joined) = workers.tasks.join_next().await {
        if let Err(e) = joined
            && e.is_panic()
        {
            tracing::error!(error = %e, "Sync worker panicked");
        }
    }
}
