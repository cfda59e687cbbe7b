use thiserror::Error;

use crate::http::HttpError;

/// Errors building a [`Connection`](super::Connection) from its configuration.
///
/// Each error concerns a single entry; reconfiguration logs it and carries on
/// with the remaining entries.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The connection URL is unparseable or has no host.
    #[error("invalid connection URL {url:?}: {message}")]
    InvalidUrl { url: String, message: String },

    /// The configured PEM certificate could not be parsed.
    #[error("invalid certificate for {url}: {message}")]
    InvalidCertificate { url: String, message: String },

    /// Another entry already normalized to the same identity URL.
    #[error("duplicate connection for {identity_url}; keeping the first entry")]
    DuplicateConnection { identity_url: String },

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client for {url}: {source}")]
    Client {
        url: String,
        #[source]
        source: HttpError,
    },
}

impl ConfigError {
    pub(crate) fn invalid_url(url: &str, message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.to_string(),
            message: message.into(),
        }
    }
}
