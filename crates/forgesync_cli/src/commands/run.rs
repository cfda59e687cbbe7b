use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, SystemTime};

use console::style;
use forgesync::sync::{
    CatalogWriter, await_catalog_task, create_catalog_channel, spawn_catalog_task,
};
use forgesync::{ConnectionRegistry, SyncSupervisor};
use tokio_util::sync::CancellationToken;

use crate::catalog::JsonLinesCatalog;
use crate::commands::shared::print_report_errors;
use crate::config::Config;

/// How long workers get to stop after Ctrl+C before they are aborted.
const WORKER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Arguments of the `run` command.
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct RunOptions {
    /// Append catalog records to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Seconds between config file checks (0 disables reloading)
    #[arg(long, default_value_t = 5)]
    pub reload_interval: u64,
}

/// Tracks modification times of config files.
struct ConfigWatcher {
    files: Vec<(PathBuf, Option<SystemTime>)>,
}

impl ConfigWatcher {
    fn new(paths: Vec<PathBuf>) -> Self {
        let files = paths
            .into_iter()
            .map(|path| {
                let mtime = modified(&path);
                (path, mtime)
            })
            .collect();
        Self { files }
    }

    /// Whether any file appeared, vanished, or was modified since the last call.
    fn changed(&mut self) -> bool {
        let mut changed = false;
        for (path, seen) in &mut self.files {
            let current = modified(path);
            if current != *seen {
                tracing::debug!(path = %path.display(), "Config file changed");
                *seen = current;
                changed = true;
            }
        }
        changed
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Run the sync supervisor until Ctrl+C, reloading the configuration when
/// its files change.
pub(crate) async fn handle_run(
    config: Config,
    config_path: Option<PathBuf>,
    opts: RunOptions,
    shutdown: CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let writer: Arc<dyn CatalogWriter> = match &opts.output {
        Some(path) => Arc::new(JsonLinesCatalog::append_to(path).await?),
        None => Arc::new(JsonLinesCatalog::stdout()),
    };

    let (tx, rx) = create_catalog_channel();
    // The catalog task outlives the workers; it ends once the supervisor
    // releases the last sender.
    let (catalog_handle, written) = spawn_catalog_task(writer, rx, CancellationToken::new());

    let registry = Arc::new(ConnectionRegistry::new(config.client_settings()));
    let supervisor = SyncSupervisor::new(
        Arc::clone(&registry),
        config.sync_settings(),
        tx,
        shutdown.clone(),
    );
    let report = supervisor.reconfigure(&config.github).await;
    print_report_errors(&report);

    eprintln!(
        "{} {} connection(s), press Ctrl+C to stop",
        style("Syncing").green().bold(),
        registry.connections().len()
    );

    let mut watcher = ConfigWatcher::new(Config::watched_files(config_path.as_deref()));
    let reload_every = Duration::from_secs(opts.reload_interval);

    loop {
        if reload_every.is_zero() {
            shutdown.cancelled().await;
            break;
        }
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(reload_every) => {}
        }
        if !watcher.changed() {
            continue;
        }

        match Config::try_load(config_path.as_deref()) {
            Ok(new_config) => {
                let report = supervisor.reconfigure(&new_config.github).await;
                print_report_errors(&report);
                tracing::info!(
                    version = report.version,
                    connections = report.loaded.len(),
                    "Configuration reloaded"
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "Invalid configuration, keeping the previous one");
            }
        }
    }

    let clean = supervisor.shutdown(WORKER_SHUTDOWN_TIMEOUT).await;
    let result = await_catalog_task(catalog_handle).await;

    eprintln!(
        "{} {} record(s) written, {} failed{}",
        style("Stopped:").bold(),
        written.load(Ordering::Relaxed),
        result.failed_count(),
        if clean { "" } else { " (workers aborted)" }
    );
    for (uri, error) in &result.errors {
        eprintln!("  {} {}: {}", style("✗").red(), uri, error);
    }
    if let Some(panic) = &result.panic_info {
        eprintln!("  {} catalog task: {}", style("✗").red(), panic);
    }

    print_quota(&registry);
    Ok(())
}

/// Log the last known quota of each connection.
fn print_quota(registry: &ConnectionRegistry) {
    for conn in registry.connections() {
        let snapshot = conn.api().rate_limit().get();
        if snapshot.known {
            tracing::info!(
                connection = %conn.identity_url(),
                remaining = snapshot.remaining,
                reset_at = %snapshot.reset_at,
                "API quota"
            );
        }
    }
}
