//! LRU memoizer for call results.

use std::num::NonZeroUsize;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lru::LruCache;

use crate::controller::CallableId;
use crate::fingerprint::CallArgs;
use crate::types::config::MemoryConfig;

const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(256) {
    Some(n) => n,
    None => unreachable!(),
};

/// Value held in memory.
#[derive(Debug, Clone)]
pub struct CachedValue<T> {
    pub value: T,

    /// When it was stored.
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedValue<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            cached_at: Utc::now(),
        }
    }

    /// Checks whether the value is older than `ttl`.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        let elapsed = Utc::now()
            .signed_duration_since(self.cached_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        elapsed > ttl
    }
}

/// Memory cache statistics.
#[derive(Debug, Clone, Default)]
pub struct MemoryStats {
    /// Current number of entries.
    pub size: usize,

    /// Maximum capacity.
    pub capacity: usize,

    pub hits: u64,

    pub misses: u64,
}

impl MemoryStats {
    /// Calculates the hit rate.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// In-process memoizer keyed by callable and argument fingerprint.
///
/// Unlike [`DiskCache`](crate::controller::DiskCache) nothing survives the
/// process. Entries never expire unless a TTL is given.
pub struct MemoryCache<T> {
    cache: LruCache<String, CachedValue<T>>,
    ttl: Option<Duration>,
    hits: u64,
    misses: u64,
}

impl<T: Clone> MemoryCache<T> {
    /// Creates a new cache.
    ///
    /// A capacity of zero falls back to the default (256).
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(DEFAULT_CAPACITY);
        Self {
            cache: LruCache::new(cap),
            ttl,
            hits: 0,
            misses: 0,
        }
    }

    /// Creates a cache from the `[memory]` config table.
    pub fn from_config(config: &MemoryConfig) -> Self {
        let ttl = (config.ttl_secs > 0).then(|| Duration::from_secs(config.ttl_secs));
        Self::new(config.capacity, ttl)
    }

    /// Key of a call: `{callable}.{fingerprint}`.
    pub fn cache_key(callable: &CallableId, args: &CallArgs) -> String {
        format!("{}.{}", callable, args.fingerprint())
    }

    /// Looks up a key.
    ///
    /// Returns `None` if not found or expired.
    pub fn get(&mut self, key: &str) -> Option<&T> {
        let expired = match (self.cache.peek(key), self.ttl) {
            (Some(cached), Some(ttl)) => Some(cached.is_expired(ttl)),
            (Some(_), None) => Some(false),
            (None, _) => None,
        };

        match expired {
            Some(true) => {
                self.cache.pop(key);
                self.misses += 1;
                None
            }
            Some(false) => {
                self.hits += 1;
                self.cache.get(key).map(|c| &c.value)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: String, value: T) {
        self.cache.put(key, CachedValue::new(value));
    }

    /// Returns the memoized value for this call, computing it on a miss.
    ///
    /// Errors from `f` are returned as-is and not cached.
    pub fn get_or_compute<E, F>(
        &mut self,
        callable: &CallableId,
        args: &CallArgs,
        f: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let key = Self::cache_key(callable, args);
        if let Some(value) = self.get(&key) {
            return Ok(value.clone());
        }

        let value = f()?;
        tracing::trace!(key = %key, "memory cache filled");
        self.insert(key, value.clone());
        Ok(value)
    }

    pub fn invalidate(&mut self, key: &str) {
        self.cache.pop(key);
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            size: self.cache.len(),
            capacity: self.cache.cap().get(),
            hits: self.hits,
            misses: self.misses,
        }
    }

    /// Drops expired entries. No-op without a TTL.
    pub fn cleanup_expired(&mut self) {
        let Some(ttl) = self.ttl else {
            return;
        };

        let expired_keys: Vec<String> = self
            .cache
            .iter()
            .filter(|(_, v)| v.is_expired(ttl))
            .map(|(k, _)| k.clone())
            .collect();

        for key in expired_keys {
            self.cache.pop(&key);
        }
    }
}
