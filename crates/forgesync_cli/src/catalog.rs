//! JSON-lines catalog sink.

use async_trait::async_trait;
use forgesync::RepoCreateOrUpdateRequest;
use forgesync::sync::{CatalogError, CatalogWriter};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// Writes each request as one JSON object per line.
///
/// Stands in for a durable catalog: downstream tooling can tail the stream
/// and upsert records keyed by `uri`.
pub(crate) struct JsonLinesCatalog {
    out: Mutex<Box<dyn AsyncWrite + Send + Unpin>>,
}

impl JsonLinesCatalog {
    pub(crate) fn new(out: Box<dyn AsyncWrite + Send + Unpin>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub(crate) fn stdout() -> Self {
        Self::new(Box::new(tokio::io::stdout()))
    }

    /// Append to `path`, creating it if needed.
    pub(crate) async fn append_to(path: &std::path::Path) -> std::io::Result<Self> {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(Self::new(Box::new(file)))
    }
}

#[async_trait]
impl CatalogWriter for JsonLinesCatalog {
    async fn create_or_update(
        &self,
        request: &RepoCreateOrUpdateRequest,
    ) -> Result<(), CatalogError> {
        let mut line = serde_json::to_vec(request)?;
        line.push(b'\n');

        let mut out = self.out.lock().await;
        out.write_all(&line).await?;
        out.flush().await?;
        Ok(())
    }
}
