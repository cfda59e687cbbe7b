//! ETag caching for conditional GET requests.
//!
//! A client that has seen an `ETag` for a URL sends it back in `If-None-Match`.
//! GitHub answers `304 Not Modified` when nothing changed, and such answers do
//! not count against the quota.

use std::collections::HashMap;

use parking_lot::Mutex;

/// Entries kept per client before the oldest ones are evicted.
pub const DEFAULT_ETAG_CACHE_CAPACITY: usize = 1024;

/// Outcome of a conditional GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult<T> {
    /// `304 Not Modified`: the cached body is still current.
    NotModified,
    /// Fresh data, with the `ETag` to send next time if the server gave one.
    Fetched { data: T, etag: Option<String> },
}

/// A cached response body and the validator it was served with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub etag: String,
    pub body: Vec<u8>,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, (u64, CachedResponse)>,
    clock: u64,
}

/// Per-client map from request URL to the last cached response.
///
/// Bounded: inserting past capacity evicts the least recently stored entry.
#[derive(Debug)]
pub struct EtagCache {
    state: Mutex<CacheState>,
    capacity: usize,
}

impl Default for EtagCache {
    fn default() -> Self {
        Self::new(DEFAULT_ETAG_CACHE_CAPACITY)
    }
}

impl EtagCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            capacity,
        }
    }

    pub fn get(&self, url: &str) -> Option<CachedResponse> {
        self.state
            .lock()
            .entries
            .get(url)
            .map(|(_, cached)| cached.clone())
    }

    pub fn insert(&self, url: impl Into<String>, etag: impl Into<String>, body: Vec<u8>) {
        if self.capacity == 0 {
            return;
        }
        let url = url.into();
        let mut state = self.state.lock();
        state.clock += 1;
        let stamp = state.clock;

        if !state.entries.contains_key(&url) && state.entries.len() >= self.capacity {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, (stamp, _))| *stamp)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                state.entries.remove(&oldest);
            }
        }

        state.entries.insert(
            url,
            (
                stamp,
                CachedResponse {
                    etag: etag.into(),
                    body,
                },
            ),
        );
    }

    pub fn remove(&self, url: &str) {
        self.state.lock().entries.remove(url);
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
