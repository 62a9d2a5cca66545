//! Single-entry cache for the unfiltered score listing.
//!
//! Only the full listing is cached; filtered queries always go to the
//! store. The resync worker invalidates the entry after a successful
//! import, so a stale TTL is the worst case, not the steady state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use fra_common::db::models::SchemeScoreRow;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
pub struct ScoreCache {
    entry: RwLock<Option<CacheEntry>>,
}

#[derive(Debug)]
struct CacheEntry {
    rows: Arc<Vec<SchemeScoreRow>>,
    loaded_at: Instant,
}

impl ScoreCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached rows, if an entry exists and is within the TTL.
    pub async fn get(&self, ttl: Duration) -> Option<Arc<Vec<SchemeScoreRow>>> {
        let guard = self.entry.read().await;
        match guard.as_ref() {
            Some(entry) if entry.loaded_at.elapsed() <= ttl => Some(Arc::clone(&entry.rows)),
            _ => None,
        }
    }

    /// Replace the cached entry, returning a shared handle to the rows.
    pub async fn put(&self, rows: Vec<SchemeScoreRow>) -> Arc<Vec<SchemeScoreRow>> {
        let rows = Arc::new(rows);
        let mut guard = self.entry.write().await;
        *guard = Some(CacheEntry {
            rows: Arc::clone(&rows),
            loaded_at: Instant::now(),
        });
        rows
    }

    pub async fn invalidate(&self) {
        let mut guard = self.entry.write().await;
        if guard.take().is_some() {
            debug!("Score cache invalidated");
        }
    }
}
