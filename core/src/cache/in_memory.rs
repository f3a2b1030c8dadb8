//! In-process TTL cache with size-bounded, oldest-first eviction.

use super::{Cache, CacheError, CacheStats};
use async_trait::async_trait;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

struct Entry<V> {
    value: V,
    created_at: Instant,
    ttl: Option<Duration>,
    hit_count: u64,
}

impl<V> Entry<V> {
    fn is_expired(&self) -> bool {
        match self.ttl {
            Some(ttl) => self.created_at.elapsed() > ttl,
            None => false,
        }
    }
}

#[derive(Default)]
struct Counters {
    hits: u64,
    misses: u64,
    expired: u64,
}

/// Thread-safe, TTL-aware cache. Pass `max_size` to enforce an entry cap
/// (oldest-by-creation-time is evicted first); pass `None` for an unbounded
/// cache.
pub struct InMemoryCache<K, V> {
    entries: RwLock<HashMap<K, Entry<V>>>,
    counters: RwLock<Counters>,
    max_size: Option<usize>,
}

impl<K, V> InMemoryCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    /// A cache with no entry-count bound (used for the prompt-response cache).
    pub fn unbounded() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            counters: RwLock::new(Counters::default()),
            max_size: None,
        }
    }

    /// A cache that evicts the oldest entry once `max_size` is exceeded
    /// (used for the embedding-vector cache, default 1000).
    pub fn bounded(max_size: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            counters: RwLock::new(Counters::default()),
            max_size: Some(max_size),
        }
    }

    async fn evict_if_over_capacity(&self) {
        let Some(max_size) = self.max_size else {
            return;
        };
        let mut entries = self.entries.write().await;
        while entries.len() > max_size {
            let oldest_key = entries
                .iter()
                .min_by_key(|(_, e)| e.created_at)
                .map(|(k, _)| k.clone());
            match oldest_key {
                Some(k) => {
                    entries.remove(&k);
                }
                None => break,
            }
        }
    }
}

#[async_trait]
impl<K, V> Cache<K, V> for InMemoryCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn get(&self, key: &K) -> Option<V> {
        let expired = {
            let entries = self.entries.read().await;
            entries.get(key).map(|e| e.is_expired())
        };

        match expired {
            None => {
                self.counters.write().await.misses += 1;
                None
            }
            Some(true) => {
                self.entries.write().await.remove(key);
                let mut counters = self.counters.write().await;
                counters.expired += 1;
                counters.misses += 1;
                None
            }
            Some(false) => {
                let mut entries = self.entries.write().await;
                let entry = entries.get_mut(key).expect("checked above");
                entry.hit_count += 1;
                let value = entry.value.clone();
                self.counters.write().await.hits += 1;
                Some(value)
            }
        }
    }

    async fn set(&self, key: K, value: V, ttl: Option<Duration>) -> Result<(), CacheError> {
        {
            let mut entries = self.entries.write().await;
            entries.insert(
                key,
                Entry {
                    value,
                    created_at: Instant::now(),
                    ttl,
                    hit_count: 0,
                },
            );
        }
        self.evict_if_over_capacity().await;
        Ok(())
    }

    async fn delete(&self, key: &K) -> Result<(), CacheError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.entries.write().await.clear();
        Ok(())
    }

    async fn stats(&self) -> CacheStats {
        let counters = self.counters.read().await;
        let entries = self.entries.read().await;
        CacheStats {
            hits: counters.hits,
            misses: counters.misses,
            expired: counters.expired,
            entries: entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn expired_entries_are_deleted_and_counted_as_miss() {
        let cache = InMemoryCache::unbounded();
        cache
            .set("k".to_string(), "v".to_string(), Some(Duration::from_millis(1)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(cache.get(&"k".to_string()).await, None);
        let stats = cache.stats().await;
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 0);
    }

    #[tokio::test]
    async fn bounded_cache_evicts_oldest_first() {
        let cache = InMemoryCache::bounded(2);
        cache.set("a".to_string(), 1, None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
        cache.set("b".to_string(), 2, None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
        cache.set("c".to_string(), 3, None).await.unwrap();

        assert_eq!(cache.get(&"a".to_string()).await, None);
        assert_eq!(cache.get(&"b".to_string()).await, Some(2));
        assert_eq!(cache.get(&"c".to_string()).await, Some(3));
    }

    #[tokio::test]
    async fn hit_counts_accumulate() {
        let cache = InMemoryCache::unbounded();
        cache.set("k".to_string(), "v".to_string(), None).await.unwrap();
        cache.get(&"k".to_string()).await;
        cache.get(&"k".to_string()).await;
        assert_eq!(cache.stats().await.hits, 2);
    }
}
