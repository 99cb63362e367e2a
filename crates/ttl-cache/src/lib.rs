//! In-memory key/value cache with per-entry expiry.
//!
//! Reads go straight to a `DashMap`; expiry is lazy (checked on `get`).
//! `get_or_try_insert_with` adds single-flight filling: concurrent misses on
//! one key serialize on a per-key async lock, so the expensive computation
//! runs at most once at a time and nobody observes a half-written value.

use dashmap::DashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    #[error("cache fill for '{key}' aborted: {reason}")]
    FillAborted { key: String, reason: String },
}

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
    last_access: AtomicU64,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

struct CacheInner<V> {
    entries: DashMap<String, CacheEntry<V>>,
    /// Per-key fill locks, present only while a fill is pending or running
    inflight: DashMap<String, Arc<Mutex<()>>>,
    default_ttl: Duration,
    max_entries: Option<usize>,
    access_clock: AtomicU64,
}

impl<V> CacheInner<V> {
    fn tick(&self) -> u64 {
        self.access_clock.fetch_add(1, Ordering::Relaxed)
    }
}

/// Held by the task running a fill. On drop the key's lock is unregistered
/// first and only then released, whatever way the fill ended.
struct InflightSlot<V> {
    inner: Arc<CacheInner<V>>,
    key: String,
    lock: Arc<Mutex<()>>,
    _guard: OwnedMutexGuard<()>,
}

impl<V> Drop for InflightSlot<V> {
    fn drop(&mut self) {
        self.inner
            .inflight
            .remove_if(&self.key, |_, m| Arc::ptr_eq(m, &self.lock));
    }
}

/// Thread-safe TTL cache. Cloning is cheap and shares the underlying store.
pub struct TtlCache<V> {
    inner: Arc<CacheInner<V>>,
}

impl<V> Clone for TtlCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> std::fmt::Debug for TtlCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("entries", &self.inner.entries.len())
            .field("default_ttl", &self.inner.default_ttl)
            .field("max_entries", &self.inner.max_entries)
            .finish()
    }
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Unbounded cache; entries leave only through expiry or explicit removal.
    pub fn new(default_ttl: Duration) -> Self {
        Self::build(default_ttl, None)
    }

    /// Cache holding at most `max_entries`; beyond that the least recently
    /// used entry is evicted (expired entries go first).
    pub fn bounded(default_ttl: Duration, max_entries: usize) -> Self {
        Self::build(default_ttl, Some(max_entries.max(1)))
    }

    fn build(default_ttl: Duration, max_entries: Option<usize>) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                entries: DashMap::new(),
                inflight: DashMap::new(),
                default_ttl,
                max_entries,
                access_clock: AtomicU64::new(0),
            }),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.inner.default_ttl
    }

    /// Fresh value for `key`, or `None`. An expired entry is evicted on the spot.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        {
            let entry = self.inner.entries.get(key)?;
            if !entry.is_expired(now) {
                entry.last_access.store(self.inner.tick(), Ordering::Relaxed);
                return Some(entry.value.clone());
            }
        }
        self.inner.entries.remove_if(key, |_, e| e.is_expired(now));
        tracing::debug!(key, "cache entry expired");
        None
    }

    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
            last_access: AtomicU64::new(self.inner.tick()),
        };
        self.inner.entries.insert(key.clone(), entry);

        if let Some(max) = self.inner.max_entries {
            self.evict_over_capacity(max, &key);
        }
    }

    /// `set` with the cache's default TTL
    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.set(key, value, self.inner.default_ttl);
    }

    pub fn invalidate(&self, key: &str) {
        self.inner.entries.remove(key);
    }

    pub fn clear(&self) {
        self.inner.entries.clear();
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.entries.len();
        self.inner.entries.retain(|_, e| !e.is_expired(now));
        before.saturating_sub(self.inner.entries.len())
    }

    fn evict_over_capacity(&self, max: usize, keep: &str) {
        if self.inner.entries.len() <= max {
            return;
        }
        self.purge_expired();

        while self.inner.entries.len() > max {
            let victim = self
                .inner
                .entries
                .iter()
                .filter(|e| e.key() != keep)
                .min_by_key(|e| e.value().last_access.load(Ordering::Relaxed))
                .map(|e| e.key().clone());

            match victim {
                Some(k) => {
                    tracing::debug!(key = %k, "evicting least recently used entry");
                    self.inner.entries.remove(&k);
                }
                None => break,
            }
        }
    }

    /// Return the cached value or compute, store and return it.
    ///
    /// Concurrent callers that miss on the same key wait for the first
    /// caller's fill and then read its result. Errors are returned to the
    /// caller and never cached. The fill runs on a spawned task, so dropping
    /// the returned future does not abandon it.
    pub async fn get_or_try_insert_with<F, Fut, E>(
        &self,
        key: &str,
        ttl: Duration,
        init: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: From<CacheError> + Send + 'static,
    {
        if let Some(value) = self.get(key) {
            tracing::debug!(key, "cache hit");
            return Ok(value);
        }

        let guard = loop {
            let lock = self
                .inner
                .inflight
                .entry(key.to_string())
                .or_default()
                .clone();
            let guard = Arc::clone(&lock).lock_owned().await;

            // Another caller may have filled the entry while we waited.
            if let Some(value) = self.get(key) {
                tracing::debug!(key, "cache filled by concurrent caller");
                return Ok(value);
            }

            // A failed fill unregisters its lock before releasing it; waiters
            // holding that lock start over so fills stay one at a time.
            let registered = self
                .inner
                .inflight
                .get(key)
                .map_or(false, |current| Arc::ptr_eq(current.value(), &lock));
            if registered {
                break InflightSlot {
                    inner: Arc::clone(&self.inner),
                    key: key.to_string(),
                    lock,
                    _guard: guard,
                };
            }
        };

        tracing::debug!(key, "cache miss, filling");
        let cache = self.clone();
        let owned_key = key.to_string();
        let fill = init();

        let handle = tokio::spawn(async move {
            let _slot = guard;
            let result = fill.await;
            if let Ok(value) = &result {
                cache.set(owned_key, value.clone(), ttl);
            }
            result
        });

        match handle.await {
            Ok(result) => result,
            Err(join_err) => Err(CacheError::FillAborted {
                key: key.to_string(),
                reason: join_err.to_string(),
            }
            .into()),
        }
    }
}
