//! Per-connection sync loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::dedup::spawn_dedup;
use super::enumerate::enumerate;
use super::types::{EXHAUSTION_SLACK, RepoCreateOrUpdateRequest, SyncPassResult, SyncSettings};
use super::wait::{sleep_or_cancelled, until_cancelled};
use crate::connection::Connection;
use crate::platform::RateLimitSnapshot;

/// How long to wait for an exhausted quota: until the reset plus some slack.
pub fn exhaustion_wait(snapshot: RateLimitSnapshot, now: DateTime<Utc>) -> Duration {
    snapshot
        .reset_after(now)
        .to_std()
        .unwrap_or(Duration::ZERO)
        + EXHAUSTION_SLACK
}

/// Run one enumeration pass and stream every distinct repository to the catalog.
pub async fn sync_connection(
    conn: &Arc<Connection>,
    settings: &SyncSettings,
    catalog_tx: &mpsc::Sender<RepoCreateOrUpdateRequest>,
    cancel: &CancellationToken,
) -> SyncPassResult {
    // Producers stop as soon as this pass ends, even if it ends early.
    let pass = cancel.child_token();
    let _stop_producers = pass.clone().drop_guard();

    let raw = enumerate(Arc::clone(conn), settings.enumeration, pass);
    let (mut unique, _dedup) = spawn_dedup(raw);
    let mut result = SyncPassResult::default();

    while let Some(Some(repo)) = until_cancelled(cancel, unique.recv()).await {
        result.discovered += 1;
        let request = RepoCreateOrUpdateRequest::new(conn, &repo);

        match until_cancelled(cancel, catalog_tx.send(request)).await {
            Some(Ok(())) => result.sent += 1,
            Some(Err(_)) => {
                tracing::warn!(
                    connection = %conn.identity_url(),
                    "Catalog channel closed, ending sync pass"
                );
                result.catalog_closed = true;
                break;
            }
            None => break,
        }
    }

    result
}

/// Sync one connection until cancelled.
///
/// Each iteration waits out an exhausted quota, runs one pass, then sleeps for
/// the resync interval. Every wait returns early on cancellation. The loop
/// also ends when the catalog channel closes.
pub async fn run_sync_worker(
    conn: Arc<Connection>,
    settings: SyncSettings,
    catalog_tx: mpsc::Sender<RepoCreateOrUpdateRequest>,
    cancel: CancellationToken,
) {
    tracing::info!(connection = %conn.identity_url(), "Sync worker started");

    loop {
        let quota = conn.api().rate_limit().get();
        if quota.known && quota.remaining < settings.rate_limit_floor {
            let wait = exhaustion_wait(quota, Utc::now());
            tracing::warn!(
                connection = %conn.identity_url(),
                remaining = quota.remaining,
                wait_secs = wait.as_secs(),
                "API rate limit is almost exhausted, waiting until it resets"
            );
            if !sleep_or_cancelled(wait, &cancel).await {
                break;
            }
        }

        let start = std::time::Instant::now();
        let result = sync_connection(&conn, &settings, &catalog_tx, &cancel).await;
        tracing::info!(
            connection = %conn.identity_url(),
            discovered = result.discovered,
            sent = result.sent,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Sync pass finished"
        );

        if result.catalog_closed || cancel.is_cancelled() {
            break;
        }
        if !sleep_or_cancelled(settings.interval, &cancel).await {
            break;
        }
    }

    tracing::info!(connection = %conn.identity_url(), "Sync worker stopped");
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use super::*;
    use crate::connection::{CloneUrlStyle, ConnectionConfig};
    use crate::platform::RepositoryApi;
    use crate::test_support::{FakeApi, remote};

    const HOST: &str = "ghe.example.com";

    fn connection(config: ConnectionConfig, api: FakeApi) -> (Arc<Connection>, Arc<FakeApi>) {
        let api = Arc::new(api);
        let conn = Connection::with_api(&config, Arc::clone(&api) as Arc<dyn RepositoryApi>).unwrap();
        (Arc::new(conn), api)
    }

    #[test]
    fn test_exhaustion_wait() {
        let now = Utc::now();
        let ahead = RateLimitSnapshot::known(5, now + ChronoDuration::seconds(50));
        assert_eq!(exhaustion_wait(ahead, now), Duration::from_secs(60));

        let already_reset = RateLimitSnapshot::known(5, now - ChronoDuration::seconds(50));
        assert_eq!(exhaustion_wait(already_reset, now), EXHAUSTION_SLACK);
    }

    #[tokio::test]
    async fn test_explicit_repo_produces_one_request() {
        let api = FakeApi::new().with_repo(remote(HOST, "acme/widgets", 7));
        let config = ConnectionConfig {
            token: Some("s3cret".to_string()),
            repository_query: vec!["none".to_string()],
            repos: vec!["acme/widgets".to_string()],
            initial_repository_enablement: true,
            ..ConnectionConfig::new(format!("https://{HOST}"))
        };
        let (conn, _) = connection(config, api);

        let (tx, mut rx) = mpsc::channel(8);
        let result =
            sync_connection(&conn, &SyncSettings::default(), &tx, &CancellationToken::new()).await;
        drop(tx);

        assert_eq!(result.discovered, 1);
        assert_eq!(result.sent, 1);
        assert!(!result.catalog_closed);

        let request = rx.recv().await.unwrap();
        assert!(rx.recv().await.is_none());
        assert_eq!(request.uri, "ghe.example.com/acme/widgets");
        assert!(request.enabled);
        assert_eq!(request.clone_url, "https://s3cret@ghe.example.com/acme/widgets");
        assert_eq!(request.external_repo.id, "R_7");
        assert_eq!(request.external_repo.service_id, "https://ghe.example.com");
        assert_eq!(request.description, "acme/widgets description");
    }

    #[tokio::test]
    async fn test_overlapping_strategies_are_deduplicated() {
        let api = FakeApi::new()
            .with_public_page(vec![remote(HOST, "a/one", 1), remote(HOST, "b/two", 2)])
            .with_viewer_page(vec![remote(HOST, "b/two", 2), remote(HOST, "c/three", 3)], None)
            .with_repo(remote(HOST, "a/one", 1));
        let config = ConnectionConfig {
            repos: vec!["a/one".to_string()],
            git_url_type: CloneUrlStyle::Ssh,
            ..ConnectionConfig::new(format!("https://{HOST}"))
        };
        let (conn, _) = connection(config, api);

        let (tx, mut rx) = mpsc::channel(8);
        let result =
            sync_connection(&conn, &SyncSettings::default(), &tx, &CancellationToken::new()).await;
        drop(tx);

        assert_eq!(result.discovered, 3);
        let mut urls = Vec::new();
        while let Some(request) = rx.recv().await {
            urls.push(request.clone_url);
        }
        urls.sort();
        assert_eq!(
            urls,
            vec![
                "git@ghe.example.com:a/one.git",
                "git@ghe.example.com:b/two.git",
                "git@ghe.example.com:c/three.git",
            ]
        );
    }

    #[tokio::test]
    async fn test_closed_catalog_ends_pass() {
        let api = FakeApi::new().with_repo(remote(HOST, "acme/widgets", 7));
        let config = ConnectionConfig {
            repository_query: vec!["none".to_string()],
            repos: vec!["acme/widgets".to_string()],
            ..ConnectionConfig::new(format!("https://{HOST}"))
        };
        let (conn, _) = connection(config, api);

        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        let result =
            sync_connection(&conn, &SyncSettings::default(), &tx, &CancellationToken::new()).await;
        assert!(result.catalog_closed);
        assert_eq!(result.sent, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_resyncs_on_interval_until_cancelled() {
        let api = FakeApi::new().with_repo(remote(HOST, "acme/widgets", 7));
        let config = ConnectionConfig {
            repository_query: vec!["none".to_string()],
            repos: vec!["acme/widgets".to_string()],
            ..ConnectionConfig::new(format!("https://{HOST}"))
        };
        let (conn, api) = connection(config, api);

        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let settings = SyncSettings {
            interval: Duration::from_secs(60),
            ..SyncSettings::default()
        };
        let worker = tokio::spawn(run_sync_worker(conn, settings, tx, cancel.clone()));

        // Two passes, the second after the (auto-advanced) resync interval.
        assert_eq!(rx.recv().await.unwrap().uri, "ghe.example.com/acme/widgets");
        assert_eq!(rx.recv().await.unwrap().uri, "ghe.example.com/acme/widgets");

        cancel.cancel();
        worker.await.unwrap();
        assert!(api.calls().len() >= 2);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_waits_for_exhausted_quota_but_honors_cancel() {
        let api = FakeApi::new().with_repo(remote(HOST, "acme/widgets", 7));
        api.rate_limit()
            .update(RateLimitSnapshot::known(10, Utc::now() + ChronoDuration::hours(1)));
        let config = ConnectionConfig {
            repository_query: vec!["none".to_string()],
            repos: vec!["acme/widgets".to_string()],
            ..ConnectionConfig::new(format!("https://{HOST}"))
        };
        let (conn, api) = connection(config, api);

        let (tx, _rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let worker = tokio::spawn(run_sync_worker(conn, SyncSettings::default(), tx, cancel.clone()));

        tokio::task::yield_now().await;
        cancel.cancel();
        worker.await.unwrap();

        // Still paused on the exhausted quota: no API call was made.
        assert!(api.calls().is_empty());
    }
}
