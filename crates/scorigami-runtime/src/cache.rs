//! Dataset cache owned by the executor.
//!
//! Entries are keyed by [`FilterKey`] and expire after a fixed TTL. The
//! cache lives and dies with its executor: a loader session clears it when
//! the session ends, and the web server builds one executor per request.
//! There is no process-wide instance.

use scorigami_core::filter::FilterKey;
use scorigami_core::types::GraphDataset;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Cache tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Seconds an entry stays fresh. `0` disables caching.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Maximum entries kept; the oldest entry is evicted beyond it.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_ttl_secs() -> u64 {
    300
}

fn default_capacity() -> usize {
    64
}

impl CacheConfig {
    /// A configuration that never stores anything.
    pub fn disabled() -> Self {
        Self {
            ttl_secs: 0,
            capacity: 1,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            capacity: default_capacity(),
        }
    }
}

struct Entry {
    dataset: Arc<GraphDataset>,
    inserted: Instant,
}

/// TTL cache of assembled datasets.
pub struct DatasetCache {
    ttl: Duration,
    capacity: usize,
    entries: Mutex<HashMap<FilterKey, Entry>>,
}

impl DatasetCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            ttl: Duration::from_secs(config.ttl_secs),
            capacity: config.capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        Self::new(CacheConfig::disabled())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Fresh entry for `key`, if any. Expired entries are removed.
    pub fn get(&self, key: &FilterKey) -> Option<Arc<GraphDataset>> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.inserted.elapsed() < self.ttl => Some(entry.dataset.clone()),
            Some(_) => {
                entries.remove(key);
                debug!(%key, "cache entry expired");
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: FilterKey, dataset: Arc<GraphDataset>) {
        if !self.is_enabled() {
            return;
        }
        let mut entries = self.lock();
        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.inserted)
                .map(|(k, _)| *k);
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }
        entries.insert(
            key,
            Entry {
                dataset,
                inserted: Instant::now(),
            },
        );
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of stored entries, expired ones included until next access.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<FilterKey, Entry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for DatasetCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
