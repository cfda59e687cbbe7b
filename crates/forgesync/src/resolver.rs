//! On-demand single-repository lookup.
//!
//! Picks the owning connection from the current registry snapshot, then
//! either asks the API or, when quota is scarce, falls back to a clonability
//! probe for unauthenticated URI lookups.

mod types;

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::connection::{Connection, ConnectionRegistry, RegistrySnapshot, SERVICE_TYPE};
use crate::github::split_name_with_owner;
use crate::probe::CloneProbe;

pub use types::{
    BYPASS_API_ENV, LookupError, LookupSettings, MIN_RATE_LIMIT_ENV, RepoLookup, RepoLookupArgs,
    ResolvedRepo, parse_bool_flag,
};

/// Replaces the whole lookup in tests of code that depends on the resolver.
pub type LookupMock =
    Arc<dyn Fn(&RepoLookupArgs) -> Result<RepoLookup, LookupError> + Send + Sync>;

/// Allowance for clock skew between us and the API when deciding whether a
/// rate limit window has already reset.
const RESET_SKEW_ALLOWANCE_SECS: i64 = 30;

pub struct Resolver {
    registry: Arc<ConnectionRegistry>,
    probe: Arc<dyn CloneProbe>,
    settings: LookupSettings,
    mock: Option<LookupMock>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("settings", &self.settings)
            .field("mocked", &self.mock.is_some())
            .finish_non_exhaustive()
    }
}

impl Resolver {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        probe: Arc<dyn CloneProbe>,
        settings: LookupSettings,
    ) -> Self {
        Self {
            registry,
            probe,
            settings,
            mock: None,
        }
    }

    /// Route every lookup through `mock` instead.
    #[must_use]
    pub fn with_mock<F>(mut self, mock: F) -> Self
    where
        F: Fn(&RepoLookupArgs) -> Result<RepoLookup, LookupError> + Send + Sync + 'static,
    {
        self.mock = Some(Arc::new(mock));
        self
    }

    pub fn settings(&self) -> LookupSettings {
        self.settings
    }

    /// Look up one repository.
    ///
    /// `Ok(RepoLookup::Unhandled)` means no configured connection owns the
    /// repository and another resolver may be tried. Every error is final.
    pub async fn lookup(&self, args: &RepoLookupArgs) -> Result<RepoLookup, LookupError> {
        if let Some(mock) = &self.mock {
            return mock(args);
        }

        let snapshot = self.registry.snapshot();
        let Some(conn) = select_connection(&snapshot, args)? else {
            return Ok(RepoLookup::Unhandled);
        };

        if self.should_bypass(conn) {
            return self.lookup_without_api(conn, args).await;
        }

        tracing::debug!(
            repo = ?args.repo,
            external_repo = ?args.external_repo.as_ref().map(|s| &s.id),
            connection = %conn.identity_url(),
            "Looking up repository"
        );

        if conn.has_token()
            && let Some(spec) = args.external_repo.as_ref().filter(|s| {
                s.service_type == SERVICE_TYPE && s.service_id == conn.identity_url()
            })
        {
            let repo = conn
                .api()
                .get_repository_by_node_id(&spec.id)
                .await
                .map_err(|e| LookupError::from_platform(&spec.id, e))?;
            return Ok(RepoLookup::Resolved(ResolvedRepo::new(conn, &repo)));
        }

        if let Some(uri) = args.uri() {
            let lowered = uri.to_lowercase();
            let prefix = format!("{}/", conn.original_hostname());
            let name_with_owner = lowered.strip_prefix(&prefix).unwrap_or(&lowered);
            let (owner, name) =
                split_name_with_owner(name_with_owner).ok_or_else(|| {
                    LookupError::InvalidIdentifier {
                        repo: uri.to_string(),
                    }
                })?;

            let repo = conn
                .api()
                .get_repository(owner, name)
                .await
                .map_err(|e| LookupError::from_platform(uri, e))?;
            return Ok(RepoLookup::Resolved(ResolvedRepo::new(conn, &repo)));
        }

        Err(LookupError::CannotResolve {
            args: format!("{args:?}"),
        })
    }

    /// Bypass when forced, or when known remaining quota is under the
    /// configured minimum and the window has not reset yet.
    fn should_bypass(&self, conn: &Connection) -> bool {
        if self.settings.bypass_api {
            return true;
        }
        if self.settings.min_rate_limit <= 0 {
            return false;
        }

        let limit = conn.api().rate_limit().get();
        limit.known
            && limit.remaining < self.settings.min_rate_limit
            && limit.reset_after(Utc::now()) > Duration::seconds(-RESET_SKEW_ALLOWANCE_SECS)
    }

    async fn lookup_without_api(
        &self,
        conn: &Connection,
        args: &RepoLookupArgs,
    ) -> Result<RepoLookup, LookupError> {
        let Some(uri) = args.uri().filter(|_| !conn.has_token()) else {
            return Ok(RepoLookup::Unhandled);
        };

        let limit = conn.api().rate_limit().get();
        tracing::debug!(
            repo = uri,
            known = limit.known,
            remaining = limit.remaining,
            "Bypassing GitHub API"
        );

        // Still probe, so paths like github.com/settings/profile or private
        // repositories never make it into the catalog.
        let remote_url = format!("https://{uri}");
        self.probe
            .check(uri, &remote_url)
            .await
            .map_err(|e| LookupError::NotFound {
                repo: uri.to_string(),
                message: e.to_string(),
            })?;

        Ok(RepoLookup::Resolved(ResolvedRepo {
            uri: uri.to_string(),
            external_repo: None,
            description: String::new(),
            fork: false,
            clone_url: remote_url,
        }))
    }
}

/// Choose the connection that owns `args`.
///
/// An identity match without a token is skipped in favour of the URI path;
/// an identity spec matching no connection at all is an error.
fn select_connection<'a>(
    snapshot: &'a RegistrySnapshot,
    args: &RepoLookupArgs,
) -> Result<Option<&'a Arc<Connection>>, LookupError> {
    if let Some(spec) = args
        .external_repo
        .as_ref()
        .filter(|s| s.service_type == SERVICE_TYPE)
    {
        let mut skipped_without_token = false;
        for conn in &snapshot.connections {
            if conn.identity_url() != spec.service_id {
                continue;
            }
            if conn.has_token() {
                return Ok(Some(conn));
            }
            skipped_without_token = true;
        }

        if !skipped_without_token {
            return Err(LookupError::UnconfiguredConnection {
                service_id: spec.service_id.clone(),
            });
        }
    }

    Ok(args.uri().and_then(|uri| snapshot.by_repo_uri(uri)))
}
