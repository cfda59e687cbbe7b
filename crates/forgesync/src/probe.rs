//! Clonability checks for remote repositories.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::http::{HttpError, HttpRequest, HttpTransport};

#[derive(Debug, Error)]
pub enum ProbeError {
    /// The remote answered, but not as a Git smart HTTP server would.
    #[error("{url} is not clonable (HTTP {status})")]
    NotClonable { url: String, status: u16 },

    /// The remote could not be reached.
    #[error("failed to reach {url}: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: HttpError,
    },
}

/// Checks whether a remote repository can be cloned.
#[async_trait]
pub trait CloneProbe: Send + Sync {
    async fn check(&self, name: &str, remote_url: &str) -> Result<(), ProbeError>;
}

/// Probes the Git smart HTTP advertisement at `{url}/info/refs`.
#[derive(Clone)]
pub struct HttpCloneProbe {
    transport: Arc<dyn HttpTransport>,
}

impl HttpCloneProbe {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    fn info_refs_url(remote_url: &str) -> String {
        format!(
            "{}/info/refs?service=git-upload-pack",
            remote_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl CloneProbe for HttpCloneProbe {
    async fn check(&self, name: &str, remote_url: &str) -> Result<(), ProbeError> {
        let url = Self::info_refs_url(remote_url);
        let request = HttpRequest::get(url).header("User-Agent", "git/forgesync");

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|source| ProbeError::Unreachable {
                url: remote_url.to_string(),
                source,
            })?;

        tracing::debug!(repo = name, status = response.status, "Probed remote");
        if response.status == 200 {
            Ok(())
        } else {
            Err(ProbeError::NotClonable {
                url: remote_url.to_string(),
                status: response.status,
            })
        }
    }
}
