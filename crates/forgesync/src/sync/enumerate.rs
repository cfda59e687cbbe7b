//! Repository enumeration for one connection.
//!
//! Each configured strategy runs as its own task, alongside a task for the
//! explicitly listed repositories. All of them feed one bounded queue, which
//! closes once every task has finished.

use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::types::EnumerationSettings;
use super::wait::{sleep_or_cancelled, until_cancelled};
use crate::connection::{Connection, strategies};
use crate::github::split_name_with_owner;
use crate::platform::{MAX_PAGE_SIZE, RemoteRepository};

/// Start an enumeration pass and return the receiving end of its queue.
///
/// The queue holds duplicates when strategies overlap; see
/// [`spawn_dedup`](super::spawn_dedup). Cancelling `cancel` stops every task
/// at its next API call, send, or pacing sleep.
pub fn enumerate(
    conn: Arc<Connection>,
    settings: EnumerationSettings,
    cancel: CancellationToken,
) -> mpsc::Receiver<RemoteRepository> {
    let (tx, rx) = mpsc::channel(settings.queue_capacity.max(1));
    let permits = Arc::new(Semaphore::new(settings.max_concurrent_strategies.max(1)));
    let mut tasks = JoinSet::new();

    for query in conn.repository_query() {
        match query.as_str() {
            strategies::PUBLIC => {
                if conn.is_public_cloud() {
                    tracing::warn!(
                        connection = %conn.identity_url(),
                        "Ignoring unsupported repository query \"public\" for the public cloud"
                    );
                    continue;
                }
                tasks.spawn(with_permit(
                    Arc::clone(&permits),
                    cancel.clone(),
                    list_public(Arc::clone(&conn), tx.clone(), cancel.clone()),
                ));
            }
            strategies::AFFILIATED => {
                tasks.spawn(with_permit(
                    Arc::clone(&permits),
                    cancel.clone(),
                    list_affiliated(Arc::clone(&conn), tx.clone(), cancel.clone()),
                ));
            }
            strategies::NONE => {}
            other => {
                tracing::error!(
                    connection = %conn.identity_url(),
                    repository_query = other,
                    "Skipping unrecognized repository query"
                );
            }
        }
    }

    if !conn.explicit_repos().is_empty() {
        tasks.spawn(with_permit(
            Arc::clone(&permits),
            cancel.clone(),
            list_explicit(Arc::clone(&conn), tx.clone(), cancel.clone()),
        ));
    }

    // Completion barrier: the queue closes when the last sender drops, which
    // happens only after every task above has finished.
    tokio::spawn(async move {
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined
                && e.is_panic()
            {
                tracing::error!(connection = %conn.identity_url(), error = %e, "Enumeration task panicked");
            }
        }
        drop(tx);
    });

    rx
}

async fn with_permit(
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
    task: impl Future<Output = ()>,
) {
    let Some(Ok(_permit)) = until_cancelled(&cancel, permits.acquire_owned()).await else {
        return;
    };
    task.await;
}

/// Send one repository downstream. Returns `false` when the pass is over,
/// either because it was cancelled or because nobody is listening.
async fn emit(
    tx: &mpsc::Sender<RemoteRepository>,
    repo: RemoteRepository,
    cancel: &CancellationToken,
) -> bool {
    matches!(until_cancelled(cancel, tx.send(repo)).await, Some(Ok(())))
}

/// Page through every public repository on the instance by ascending ID.
async fn list_public(
    conn: Arc<Connection>,
    tx: mpsc::Sender<RemoteRepository>,
    cancel: CancellationToken,
) {
    let api = conn.api();
    let mut since_id = 0i64;

    loop {
        let page = match until_cancelled(&cancel, api.list_public_repositories(since_id)).await {
            None => return,
            Some(Ok(page)) => page,
            Some(Err(e)) => {
                tracing::error!(
                    connection = %conn.identity_url(),
                    since_id,
                    error = %e,
                    "Error listing public repositories"
                );
                return;
            }
        };

        if page.is_empty() {
            return;
        }

        let previous = since_id;
        for repo in page {
            since_id = since_id.max(repo.database_id);
            if !emit(&tx, repo, &cancel).await {
                return;
            }
        }

        if since_id == previous {
            tracing::warn!(
                connection = %conn.identity_url(),
                since_id,
                "Public repository cursor did not advance, stopping"
            );
            return;
        }
    }
}

/// Page through the repositories visible to the configured credential,
/// pacing pages by their reported cost.
async fn list_affiliated(
    conn: Arc<Connection>,
    tx: mpsc::Sender<RemoteRepository>,
    cancel: CancellationToken,
) {
    let api = conn.api();
    let mut cursor: Option<String> = None;

    loop {
        let request = api.list_viewer_repositories(MAX_PAGE_SIZE, cursor.as_deref());
        let page = match until_cancelled(&cancel, request).await {
            None => return,
            Some(Ok(page)) => page,
            Some(Err(e)) => {
                tracing::error!(
                    connection = %conn.identity_url(),
                    cursor = ?cursor,
                    error = %e,
                    "Error listing affiliated repositories"
                );
                return;
            }
        };

        let quota = api.graphql_rate_limit().get();
        tracing::debug!(
            connection = %conn.identity_url(),
            repos = page.repos.len(),
            cost = page.cost,
            remaining = quota.remaining,
            reset_at = %quota.reset_at,
            "Listed affiliated repositories page"
        );

        for repo in page.repos {
            if !emit(&tx, repo, &cancel).await {
                return;
            }
        }

        let Some(next) = page.end_cursor else {
            return;
        };
        cursor = Some(next);

        // Page cost is in GraphQL points, so pace against the GraphQL quota.
        let wait = api
            .graphql_rate_limit()
            .recommended_wait_for_background_op(page.cost);
        if !sleep_or_cancelled(wait, &cancel).await {
            return;
        }
    }
}

/// Fetch each explicitly configured repository, skipping the ones that fail.
async fn list_explicit(
    conn: Arc<Connection>,
    tx: mpsc::Sender<RemoteRepository>,
    cancel: CancellationToken,
) {
    let api = conn.api();

    for name_with_owner in conn.explicit_repos() {
        let Some((owner, name)) = split_name_with_owner(name_with_owner) else {
            tracing::error!(
                connection = %conn.identity_url(),
                name_with_owner = %name_with_owner,
                "Invalid repository name, expected owner/name"
            );
            continue;
        };

        match until_cancelled(&cancel, api.get_repository(owner, name)).await {
            None => return,
            Some(Err(e)) => {
                tracing::error!(
                    connection = %conn.identity_url(),
                    name_with_owner = %name_with_owner,
                    error = %e,
                    "Error getting repository"
                );
                continue;
            }
            Some(Ok(repo)) => {
                tracing::debug!(repo = %repo.name_with_owner, "Fetched explicitly listed repository");
                if !emit(&tx, repo, &cancel).await {
                    return;
                }
            }
        }

        // Zero unless the quota is running low.
        let wait = api.rate_limit().recommended_wait_for_background_op(1);
        if !sleep_or_cancelled(wait, &cancel).await {
            return;
        }
    }
}
