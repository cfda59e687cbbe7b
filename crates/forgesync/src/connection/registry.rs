use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::{ClientSettings, ConfigError, Connection, ConnectionConfig};

/// Builds one connection from one configuration entry.
pub type ConnectionBuilder =
    Arc<dyn Fn(&ConnectionConfig) -> Result<Connection, ConfigError> + Send + Sync>;

/// An immutable set of connections.
///
/// Readers hold an `Arc` to a snapshot; reconfiguration installs a new one
/// without touching the old.
#[derive(Debug, Default)]
pub struct RegistrySnapshot {
    /// Incremented on every reconfiguration; `0` before the first.
    pub version: u64,
    pub connections: Vec<Arc<Connection>>,
}

impl RegistrySnapshot {
    /// Connection whose identity URL equals `identity_url` exactly.
    pub fn by_identity_url(&self, identity_url: &str) -> Option<&Arc<Connection>> {
        self.connections
            .iter()
            .find(|c| c.identity_url() == identity_url)
    }

    /// First connection whose hostname followed by `/` prefixes the
    /// lowercased repository URI.
    pub fn by_repo_uri(&self, uri: &str) -> Option<&Arc<Connection>> {
        let uri = uri.to_lowercase();
        self.connections.iter().find(|c| {
            uri.strip_prefix(c.original_hostname())
                .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

/// Outcome of one reconfiguration.
#[derive(Debug, Default)]
pub struct ReconfigureReport {
    pub version: u64,
    /// Identity URLs of the connections now installed, in configuration order.
    pub loaded: Vec<String>,
    /// Entries that were skipped.
    pub errors: Vec<ConfigError>,
    /// Whether the implicit public cloud entry was added.
    pub implicit_public_cloud: bool,
}

/// The current set of configured connections.
pub struct ConnectionRegistry {
    current: RwLock<Arc<RegistrySnapshot>>,
    reconfigure_lock: Mutex<()>,
    builder: ConnectionBuilder,
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("version", &self.version())
            .finish_non_exhaustive()
    }
}

impl ConnectionRegistry {
    /// Create an empty registry whose connections use real GitHub clients.
    pub fn new(settings: ClientSettings) -> Self {
        Self::with_builder(Arc::new(move |config: &ConnectionConfig| {
            Connection::from_config(config, &settings)
        }))
    }

    /// Create an empty registry with a custom connection builder.
    pub fn with_builder(builder: ConnectionBuilder) -> Self {
        Self {
            current: RwLock::new(Arc::new(RegistrySnapshot::default())),
            reconfigure_lock: Mutex::new(()),
            builder,
        }
    }

    /// Rebuild the connection set from configuration and install it.
    ///
    /// Entries are built independently: an entry that fails is logged, reported
    /// and skipped. When no entry names the public cloud, an implicit entry
    /// with enumeration disabled is appended so public cloud lookups still
    /// resolve. Concurrent calls are serialized.
    pub fn reconfigure(&self, configs: &[ConnectionConfig]) -> ReconfigureReport {
        let _guard = self.reconfigure_lock.lock();

        let mut configs = configs.to_vec();
        let implicit_public_cloud = !configs.iter().any(ConnectionConfig::targets_public_cloud);
        if implicit_public_cloud {
            configs.push(ConnectionConfig::implicit_public_cloud());
        }

        let mut connections = Vec::with_capacity(configs.len());
        let mut seen = HashSet::new();
        let mut errors = Vec::new();

        for config in &configs {
            let result = (self.builder)(config).and_then(|conn| {
                if seen.insert(conn.identity_url().to_string()) {
                    Ok(conn)
                } else {
                    Err(ConfigError::DuplicateConnection {
                        identity_url: conn.identity_url().to_string(),
                    })
                }
            });

            match result {
                Ok(conn) => connections.push(Arc::new(conn)),
                Err(e) => {
                    tracing::error!(
                        url = %config.url,
                        error = %e,
                        "Error processing configured GitHub connection, skipping it"
                    );
                    errors.push(e);
                }
            }
        }

        let loaded = connections
            .iter()
            .map(|c| c.identity_url().to_string())
            .collect();

        let version = {
            let mut current = self.current.write();
            let version = current.version + 1;
            *current = Arc::new(RegistrySnapshot {
                version,
                connections,
            });
            version
        };

        tracing::info!(
            version,
            connections = configs.len() - errors.len(),
            skipped = errors.len(),
            implicit_public_cloud,
            "Connection registry reconfigured"
        );

        ReconfigureReport {
            version,
            loaded,
            errors,
            implicit_public_cloud,
        }
    }

    /// The current snapshot. Holding it never blocks a reconfiguration.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.current.read().clone()
    }

    pub fn connections(&self) -> Vec<Arc<Connection>> {
        self.snapshot().connections.clone()
    }

    pub fn version(&self) -> u64 {
        self.current.read().version
    }

    pub fn by_identity_url(&self, identity_url: &str) -> Option<Arc<Connection>> {
        self.snapshot().by_identity_url(identity_url).cloned()
    }

    pub fn by_repo_uri(&self, uri: &str) -> Option<Arc<Connection>> {
        self.snapshot().by_repo_uri(uri).cloned()
    }
}
