use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{debug, info};

use crate::domains::bookings::Booking;

// ============================================================================
// CACHE ABSTRACTION
// ============================================================================

/// Key-value cache with per-entry expiry.
pub trait KeyValueCache<V>: Send + Sync {
    fn get(&self, key: &str) -> Option<V>;
    fn set(&self, key: &str, value: V, ttl: Duration);
    /// Returns true when an entry was removed.
    fn invalidate(&self, key: &str) -> bool;
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub entries: usize,
}

#[derive(Clone)]
struct CacheEntry<V> {
    value: V,
    expiry: Instant,
}

// ============================================================================
// TTL CACHE
// ============================================================================

/// In-process TTL cache. Expired entries are dropped lazily on `get` and by
/// the background sweep.
pub struct TtlCache<V> {
    store: DashMap<String, CacheEntry<V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Holds the parsed booking collection, one snapshot per table.
pub type BookingCache = TtlCache<Arc<Vec<Booking>>>;

impl<V: Clone + Send + Sync + 'static> TtlCache<V> {
    pub fn new() -> Self {
        Self {
            store: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Remove all expired entries from the cache
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let before_count = self.store.len();
        self.store.retain(|_, entry| entry.expiry > now);
        let removed = before_count - self.store.len();
        if removed > 0 {
            debug!("TtlCache cleanup: removed {} expired entries", removed);
        }
        removed
    }

    /// Start background cleanup task
    pub fn start_background_cleanup(cache: Arc<Self>, every: Duration) {
        tokio::spawn(async move {
            let mut cleanup_interval = interval(every);
            info!("Started background cache cleanup task (interval: {}s)", every.as_secs());

            loop {
                cleanup_interval.tick().await;
                cache.cleanup_expired();
            }
        });
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            hits,
            misses,
            hit_rate: if total == 0 { 0.0 } else { hits as f64 / total as f64 * 100.0 },
            entries: self.store.len(),
        }
    }
}

impl<V: Clone + Send + Sync + 'static> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync + 'static> KeyValueCache<V> for TtlCache<V> {
    fn get(&self, key: &str) -> Option<V> {
        if let Some(entry) = self.store.get(key) {
            if entry.expiry > Instant::now() {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value.clone());
            }
        }
        // Expired entries are removed outside the read guard
        self.store.remove_if(key, |_, entry| entry.expiry <= Instant::now());
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    fn set(&self, key: &str, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expiry: Instant::now() + ttl,
        };
        self.store.insert(key.to_string(), entry);
    }

    fn invalidate(&self, key: &str) -> bool {
        self.store.remove(key).is_some()
    }
}
