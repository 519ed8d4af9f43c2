//! TTL cache for computed aggregates
//!
//! Every key owns an async mutex slot. A lookup holds the slot while it
//! recomputes, so concurrent misses on one key wait for the in-flight
//! computation and then read its result instead of starting their own.

use crate::collector::MetricCollector;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::debug;

/// Key used by [`CacheLayer::round_trip_check`]
const ROUND_TRIP_KEY: &str = "__round_trip__";

struct Entry<V> {
    value: V,
    computed_at: DateTime<Utc>,
    stored_at: Instant,
}

type Slot<V> = Arc<Mutex<Option<Entry<V>>>>;

/// When and how long ago a cached value was computed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryInfo {
    /// Wall-clock time the value was stored
    pub computed_at: DateTime<Utc>,
    /// Time since the value was stored
    pub age: Duration,
}

/// Keyed cache with per-lookup TTL
pub struct CacheLayer<V> {
    name: &'static str,
    slots: RwLock<HashMap<String, Slot<V>>>,
    collector: Option<Arc<MetricCollector>>,
}

impl<V> CacheLayer<V>
where
    V: Clone + Send + Sync,
{
    /// Create an empty cache; `name` labels its hit/miss counters
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slots: RwLock::new(HashMap::new()),
            collector: None,
        }
    }

    /// Record hits and misses into `library_cache_operations_total`
    pub fn with_collector(mut self, collector: Arc<MetricCollector>) -> Self {
        self.collector = Some(collector);
        self
    }

    /// Label used for this cache's hit/miss counters
    pub fn name(&self) -> &'static str {
        self.name
    }

    async fn slot(&self, key: &str) -> Slot<V> {
        if let Some(slot) = self.slots.read().await.get(key) {
            return slot.clone();
        }
        self.slots
            .write()
            .await
            .entry(key.to_string())
            .or_default()
            .clone()
    }

    fn record(&self, hit: bool) {
        if let Some(collector) = &self.collector {
            collector.track_cache_operation("get", self.name, hit);
        }
    }

    /// Return the cached value for `key` while younger than `ttl`, otherwise
    /// compute, store and return a fresh one.
    ///
    /// A failed computation leaves any previous entry untouched and returns
    /// the error.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let slot = self.slot(key).await;
        let mut guard = slot.lock().await;

        if let Some(entry) = guard.as_ref() {
            if entry.stored_at.elapsed() < ttl {
                self.record(true);
                return Ok(entry.value.clone());
            }
        }

        self.record(false);
        debug!(cache = self.name, key, "Cache miss, recomputing");

        let value = compute().await?;
        *guard = Some(Entry {
            value: value.clone(),
            computed_at: Utc::now(),
            stored_at: Instant::now(),
        });
        Ok(value)
    }

    /// Fresh cached value, if any
    pub async fn get(&self, key: &str, ttl: Duration) -> Option<V> {
        let slot = self.slots.read().await.get(key).cloned()?;
        let guard = slot.lock().await;
        guard
            .as_ref()
            .filter(|entry| entry.stored_at.elapsed() < ttl)
            .map(|entry| entry.value.clone())
    }

    /// Replace the entry for `key`
    pub async fn insert(&self, key: &str, value: V) {
        let slot = self.slot(key).await;
        *slot.lock().await = Some(Entry {
            value,
            computed_at: Utc::now(),
            stored_at: Instant::now(),
        });
    }

    /// Drop `key` and its entry; returns whether a value was stored
    pub async fn invalidate(&self, key: &str) -> bool {
        let Some(slot) = self.slots.write().await.remove(key) else {
            return false;
        };
        slot.lock().await.take().is_some()
    }

    /// Drop every key and entry
    pub async fn clear(&self) {
        let slots: Vec<Slot<V>> = self.slots.write().await.drain().map(|(_, s)| s).collect();
        for slot in slots {
            slot.lock().await.take();
        }
    }

    /// Drop keys whose entry is missing or older than `ttl`
    ///
    /// Slots with a computation in flight are kept. Returns the number of
    /// keys removed.
    pub async fn purge_expired(&self, ttl: Duration) -> usize {
        let mut slots = self.slots.write().await;
        let before = slots.len();
        slots.retain(|_, slot| match slot.try_lock() {
            Ok(guard) => guard
                .as_ref()
                .is_some_and(|entry| entry.stored_at.elapsed() < ttl),
            Err(_) => true,
        });
        let removed = before - slots.len();
        if removed > 0 {
            debug!(cache = self.name, removed, "Purged expired keys");
        }
        removed
    }

    /// Number of keys known to the cache, with or without a stored value
    pub async fn key_count(&self) -> usize {
        self.slots.read().await.len()
    }

    /// Age and computation time of the entry for `key`
    pub async fn entry_info(&self, key: &str) -> Option<EntryInfo> {
        let slot = self.slots.read().await.get(key).cloned()?;
        let guard = slot.lock().await;
        guard.as_ref().map(|entry| EntryInfo {
            computed_at: entry.computed_at,
            age: entry.stored_at.elapsed(),
        })
    }

    /// Number of keys holding a value
    pub async fn len(&self) -> usize {
        let slots: Vec<Slot<V>> = self.slots.read().await.values().cloned().collect();
        let mut count = 0;
        for slot in slots {
            if slot.lock().await.is_some() {
                count += 1;
            }
        }
        count
    }

    /// Whether no key holds a value
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Write `sentinel` and read it back
    pub async fn round_trip_check(&self, sentinel: V) -> bool
    where
        V: PartialEq,
    {
        self.insert(ROUND_TRIP_KEY, sentinel.clone()).await;
        let read = self.get(ROUND_TRIP_KEY, Duration::MAX).await;
        self.invalidate(ROUND_TRIP_KEY).await;
        read.as_ref() == Some(&sentinel)
    }
}

impl<V> std::fmt::Debug for CacheLayer<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheLayer").field("name", &self.name).finish()
    }
}
