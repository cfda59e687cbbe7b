use std::collections::HashSet;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::platform::RemoteRepository;

/// Remote URLs already forwarded during one enumeration pass.
#[derive(Debug, Default)]
pub struct Dedup {
    seen: HashSet<String>,
}

impl Dedup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true the first time a repository's remote URL is offered.
    pub fn first_sighting(&mut self, repo: &RemoteRepository) -> bool {
        self.seen.insert(repo.url.clone())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Forward each repository from `input` once, in first-seen order.
///
/// The returned handle resolves to the number of duplicates dropped once
/// `input` closes or the output receiver goes away. The seen-set lives only
/// as long as the task.
pub fn spawn_dedup(
    mut input: mpsc::Receiver<RemoteRepository>,
) -> (mpsc::Receiver<RemoteRepository>, JoinHandle<usize>) {
    let (tx, rx) = mpsc::channel(1);

    let handle = tokio::spawn(async move {
        let mut dedup = Dedup::new();
        let mut duplicates = 0usize;

        while let Some(repo) = input.recv().await {
            if !dedup.first_sighting(&repo) {
                duplicates += 1;
                continue;
            }
            if tx.send(repo).await.is_err() {
                break;
            }
        }

        tracing::debug!(unique = dedup.len(), duplicates, "Dedup pass finished");
        duplicates
    });

    (rx, handle)
}
