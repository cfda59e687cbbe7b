//! Integration tests for on-demand lookups.

mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use forgesync::{
    CloneProbe, ConnectionConfig, ConnectionRegistry, ExternalRepoSpec, LookupError,
    LookupSettings, ProbeError, RateLimitSnapshot, RepoLookup, RepoLookupArgs, RepositoryApi,
    Resolver,
};

use common::{StaticHost, builder, repo};

#[derive(Default)]
struct RecordingProbe {
    probed: Mutex<Vec<String>>,
}

#[async_trait]
impl CloneProbe for RecordingProbe {
    async fn check(&self, _name: &str, remote_url: &str) -> Result<(), ProbeError> {
        self.probed.lock().unwrap().push(remote_url.to_string());
        Ok(())
    }
}

fn build_resolver(
    api: Arc<StaticHost>,
    configs: &[ConnectionConfig],
    settings: LookupSettings,
) -> (Resolver, Arc<RecordingProbe>) {
    let registry = ConnectionRegistry::with_builder(builder(api));
    registry.reconfigure(configs);
    let probe = Arc::new(RecordingProbe::default());
    (
        Resolver::new(Arc::new(registry), probe.clone(), settings),
        probe,
    )
}

fn widgets() -> Arc<StaticHost> {
    Arc::new(StaticHost::new(vec![repo("github.com", "acme/widgets", 7)]))
}

#[tokio::test]
async fn test_bypass_threshold() {
    let settings = LookupSettings {
        bypass_api: false,
        min_rate_limit: 100,
    };
    let args = RepoLookupArgs::by_uri("github.com/acme/widgets");

    // 50 left out of a minimum of 100, resetting in 5s: bypass.
    let api = widgets();
    api.rate_limit()
        .update(RateLimitSnapshot::known(50, Utc::now() + Duration::seconds(5)));
    let (resolver, probe) = build_resolver(api.clone(), &[], settings);

    let resolved = resolver.lookup(&args).await.unwrap().resolved().unwrap();
    assert_eq!(resolved.external_repo, None);
    assert_eq!(
        *probe.probed.lock().unwrap(),
        vec!["https://github.com/acme/widgets"]
    );
    assert!(api.requests().is_empty());

    // 500 left: the API is used.
    let api = widgets();
    api.rate_limit()
        .update(RateLimitSnapshot::known(500, Utc::now() + Duration::seconds(5)));
    let (resolver, probe) = build_resolver(api.clone(), &[], settings);

    let resolved = resolver.lookup(&args).await.unwrap().resolved().unwrap();
    assert_eq!(resolved.external_repo.map(|s| s.id).as_deref(), Some("R_7"));
    assert!(probe.probed.lock().unwrap().is_empty());
    assert_eq!(api.requests(), vec!["repo acme/widgets"]);
}

#[tokio::test]
async fn test_identity_without_token_defers_to_uri() {
    let api = widgets();
    let (resolver, _) = build_resolver(
        api.clone(),
        &[ConnectionConfig::new("https://ghe.example.com")],
        LookupSettings::default(),
    );

    let args = RepoLookupArgs {
        external_repo: Some(ExternalRepoSpec {
            id: "R_99".to_string(),
            service_type: "github".to_string(),
            service_id: "https://ghe.example.com".to_string(),
        }),
        repo: Some("github.com/acme/widgets".to_string()),
    };

    let lookup = resolver.lookup(&args).await.unwrap();
    assert!(lookup.is_authoritative());
    let resolved = lookup.resolved().unwrap();
    assert_eq!(resolved.uri, "github.com/acme/widgets");
    assert_eq!(
        resolved.external_repo.unwrap().service_id,
        "https://github.com"
    );
    assert_eq!(api.requests(), vec!["repo acme/widgets"]);
}

#[tokio::test]
async fn test_foreign_service_type_is_unhandled() {
    let (resolver, _) = build_resolver(widgets(), &[], LookupSettings::default());

    let args = RepoLookupArgs::by_external(ExternalRepoSpec {
        id: "42".to_string(),
        service_type: "gitlab".to_string(),
        service_id: "https://gitlab.com".to_string(),
    });
    assert_eq!(resolver.lookup(&args).await.unwrap(), RepoLookup::Unhandled);
}

#[tokio::test]
async fn test_unconfigured_identity() {
    let (resolver, _) = build_resolver(widgets(), &[], LookupSettings::default());

    let args = RepoLookupArgs::by_external(ExternalRepoSpec {
        id: "R_1".to_string(),
        service_type: "github".to_string(),
        service_id: "https://ghe.example.com".to_string(),
    });
    let err = resolver.lookup(&args).await.unwrap_err();
    assert!(matches!(err, LookupError::UnconfiguredConnection { .. }));
}

#[tokio::test]
async fn test_reconfiguration_is_visible_to_lookups() {
    let api = Arc::new(StaticHost::new(vec![repo("ghe.example.com", "team/tools", 3)]));
    let registry = Arc::new(ConnectionRegistry::with_builder(builder(api)));
    registry.reconfigure(&[]);
    let resolver = Resolver::new(
        Arc::clone(&registry),
        Arc::new(RecordingProbe::default()),
        LookupSettings::default(),
    );
    let args = RepoLookupArgs::by_uri("ghe.example.com/team/tools");

    assert_eq!(resolver.lookup(&args).await.unwrap(), RepoLookup::Unhandled);

    registry.reconfigure(&[ConnectionConfig::new("https://ghe.example.com")]);
    let resolved = resolver.lookup(&args).await.unwrap().resolved().unwrap();
    assert_eq!(resolved.uri, "ghe.example.com/team/tools");
}
