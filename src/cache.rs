use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, interval};

use crate::metrics::CACHE_SIZE;

// Cache entry with expiry deadline
#[derive(Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Time-expiring key/value store.
///
/// Expired entries read as absent straight away; `sweep` reclaims their memory.
/// Only successful payloads should ever be passed to `set`.
#[derive(Clone)]
pub struct TtlCache<V> {
    entries: Arc<DashMap<String, CacheEntry<V>>>,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    // Present and fresh only, never touches the map
    pub fn get(&self, key: &str) -> Option<V> {
        let entry = self.entries.get(key)?;
        if entry.is_expired(Instant::now()) {
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn set(&self, key: impl Into<String>, value: V) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
        CACHE_SIZE.set(self.entries.len() as f64);
    }

    /// Drop every expired entry, returning how many went.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let after = self.entries.len();
        CACHE_SIZE.set(after as f64);
        before.saturating_sub(after)
    }

    // Includes expired entries not yet swept
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// Cache key for a guild detail lookup
pub fn guild_cache_key(guild_id: &str) -> String {
    format!("guild_{}", guild_id)
}

// Periodic sweep so expired guilds don't pile up
pub async fn cache_sweeper<V: Clone>(cache: TtlCache<V>, check_interval: Duration) {
    let mut ticker = interval(check_interval);

    tracing::info!(interval = ?check_interval, "guild cache sweeper started");

    loop {
        ticker.tick().await;

        let evicted = cache.sweep();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = cache.len(), "swept expired cache entries");
        }
    }
}
