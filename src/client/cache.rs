//! In-memory GET response cache
//!
//! Entries live for a fixed TTL and the least recently used entry is evicted
//! once the cache is full. Any mutation through the client clears the whole
//! cache, since one write can change many listings.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

/// Default number of cached responses
pub const DEFAULT_CAPACITY: usize = 256;

struct CacheEntry {
    body: String,
    stored_at: Instant,
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

pub struct ResponseCache {
    ttl: Duration,
    entries: Mutex<LruCache<String, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, DEFAULT_CAPACITY)
    }

    /// A zero capacity is treated as one
    pub fn with_capacity(ttl: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);

        Self {
            ttl,
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cached body for a path+query key, if still fresh
    pub fn get(&self, key: &str) -> Option<String> {
        self.get_at(key, Instant::now())
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<String> {
        let mut entries = self.entries.lock();

        let lookup = entries.get(key).map(|entry| {
            (now.saturating_duration_since(entry.stored_at) < self.ttl).then(|| entry.body.clone())
        });

        let fresh = match lookup {
            Some(Some(body)) => Some(body),
            Some(None) => {
                entries.pop(key);
                None
            }
            None => None,
        };

        match fresh {
            Some(body) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(body)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, key: &str, body: String) {
        self.insert_at(key, body, Instant::now());
    }

    fn insert_at(&self, key: &str, body: String, now: Instant) {
        self.entries.lock().put(
            key.to_string(),
            CacheEntry {
                body,
                stored_at: now,
            },
        );
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        if !entries.is_empty() {
            tracing::trace!(entries = entries.len(), "Response cache cleared");
        }
        entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.lock().len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_within_ttl() {
        let cache = ResponseCache::default();
        let t0 = Instant::now();
        cache.insert_at("/api/classes", "[]".into(), t0);

        assert_eq!(
            cache.get_at("/api/classes", t0 + Duration::from_secs(29)).as_deref(),
            Some("[]")
        );
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_expired_entry_is_evicted() {
        let cache = ResponseCache::default();
        let t0 = Instant::now();
        cache.insert_at("/api/classes", "[]".into(), t0);

        assert!(cache.get_at("/api/classes", t0 + Duration::from_secs(30)).is_none());
        assert_eq!(cache.stats().entries, 0);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let cache = ResponseCache::with_capacity(DEFAULT_TTL, 2);
        cache.insert("/api/uploads?q=a", "a".into());
        cache.insert("/api/uploads?q=b", "b".into());
        assert!(cache.get("/api/uploads?q=a").is_some());

        cache.insert("/api/uploads?q=c", "c".into());
        assert_eq!(cache.stats().entries, 2);
        assert!(cache.get("/api/uploads?q=b").is_none());
        assert!(cache.get("/api/uploads?q=a").is_some());
        assert!(cache.get("/api/uploads?q=c").is_some());
    }

    #[test]
    fn test_distinct_queries_stay_bounded() {
        let cache = ResponseCache::default();
        for i in 0..10_000 {
            cache.insert(&format!("/api/uploads?q={}", i), "[]".into());
        }
        assert_eq!(cache.stats().entries, DEFAULT_CAPACITY);
    }

    #[test]
    fn test_query_string_is_part_of_key() {
        let cache = ResponseCache::default();
        cache.insert("/api/uploads?q=genetics", "[1]".into());
        assert!(cache.get("/api/uploads?q=physics").is_none());
        assert!(cache.get("/api/uploads?q=genetics").is_some());
    }

    #[test]
    fn test_clear_drops_everything() {
        let cache = ResponseCache::default();
        cache.insert("/a", "1".into());
        cache.insert("/b", "2".into());
        cache.clear();
        assert_eq!(cache.stats().entries, 0);
        assert!(cache.get("/a").is_none());
    }
}
