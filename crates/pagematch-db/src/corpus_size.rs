//! Time-bounded cache of per-model corpus sizes.
//!
//! `ef_search` only needs the order of magnitude of the corpus, so the
//! count is taken once per model and reused until it expires instead of
//! scanning the document table on every prefilter query.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy)]
struct CachedSize {
    size: u64,
    refreshed_at: Instant,
}

/// Corpus sizes keyed by embedding model, each expiring after `ttl`.
#[derive(Debug)]
pub struct CorpusSizeCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedSize>>,
}

impl CorpusSizeCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached size for `model`, if it has not expired.
    pub async fn get(&self, model: &str) -> Option<u64> {
        let entries = self.entries.read().await;
        entries
            .get(model)
            .filter(|cached| cached.refreshed_at.elapsed() < self.ttl)
            .map(|cached| cached.size)
    }

    /// Record a freshly counted size for `model`.
    pub async fn insert(&self, model: &str, size: u64) {
        self.entries.write().await.insert(
            model.to_string(),
            CachedSize {
                size,
                refreshed_at: Instant::now(),
            },
        );
    }

    /// Drop every cached size so the next lookup recounts.
    pub async fn invalidate(&self) {
        self.entries.write().await.clear();
    }
}
