use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

/// TTL-bounded LRU cache for classifier output. Re-classifying the same
/// message against the same conversation context is pure waste of a
/// remote call, so entries are keyed by a digest of both.
pub struct ClassificationCache<T> {
    cache: Mutex<LruCache<String, (T, Instant)>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    pub hit_rate: f64,
}

impl<T> ClassificationCache<T> {
    pub fn new(capacity: usize, ttl_secs: u64) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                capacity.max(1).try_into().expect("capacity is non-zero"),
            )),
            ttl: Duration::from_secs(ttl_secs),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: &str) -> Option<T>
    where
        T: Clone,
    {
        let mut cache = self.cache.lock();
        if let Some((value, timestamp)) = cache.get(key) {
            if timestamp.elapsed() < self.ttl {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value.clone())
            } else {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    pub fn set(&self, key: &str, value: T) {
        let mut cache = self.cache.lock();
        cache.put(key.to_string(), (value, Instant::now()));
    }

    /// Digest of the message plus every context field that can change the
    /// classification outcome.
    pub fn make_key(message: &str, context_fields: &[Option<&str>]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(message.as_bytes());
        for field in context_fields {
            hasher.update(b"\x1f");
            if let Some(value) = field {
                hasher.update(value.as_bytes());
            }
        }
        format!("{:x}", hasher.finalize())
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };
        let cache = self.cache.lock();

        CacheStats {
            hits,
            misses,
            size: cache.len(),
            hit_rate,
        }
    }

    pub fn clear(&self) {
        let mut cache = self.cache.lock();
        cache.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_and_miss_accounting() {
        let cache: ClassificationCache<String> = ClassificationCache::new(10, 60);
        assert!(cache.get("k1").is_none());
        cache.set("k1", "v1".to_string());
        assert_eq!(cache.get("k1"), Some("v1".to_string()));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let cache: ClassificationCache<u32> = ClassificationCache::new(10, 0);
        cache.set("k1", 7);
        assert!(cache.get("k1").is_none());
    }

    #[test]
    fn test_make_key_distinguishes_context() {
        let base = ClassificationCache::<u32>::make_key("putih", &[Some("sofa"), None]);
        let same = ClassificationCache::<u32>::make_key("putih", &[Some("sofa"), None]);
        let shifted = ClassificationCache::<u32>::make_key("putih", &[None, Some("sofa")]);
        let other = ClassificationCache::<u32>::make_key("putih", &[Some("meja"), None]);
        assert_eq!(base, same);
        assert_ne!(base, shifted);
        assert_ne!(base, other);
    }

    #[test]
    fn test_lru_eviction() {
        let cache: ClassificationCache<u32> = ClassificationCache::new(2, 60);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("c", 3);
        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("c"), Some(3));
    }
}
