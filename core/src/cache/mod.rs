//! Generic TTL cache used for prompt responses and embedding vectors.
//!
//! Two instances of [`InMemoryCache`] back the pipeline: an unbounded
//! prompt-response cache and a size-bounded embedding-vector cache. Keys are
//! derived by [`key::CacheKey`], which folds the conversation memory into the
//! hash so that two sessions never share an answer cached under different
//! context.

mod error;
mod in_memory;
pub mod key;

pub use error::CacheError;
pub use in_memory::InMemoryCache;
pub use key::CacheKey;

use async_trait::async_trait;
use std::time::Duration;

/// Point-in-time counters for one cache instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expired: u64,
    pub entries: usize,
}

/// Cache trait for key-value storage with optional TTL.
#[async_trait]
pub trait Cache<K, V>: Send + Sync
where
    K: Send + Sync,
    V: Clone + Send + Sync,
{
    /// Get a value from the cache by key.
    ///
    /// Returns `None` if the key is not found or has expired. An expired
    /// entry is deleted as a side effect and counted as a miss.
    async fn get(&self, key: &K) -> Option<V>;

    /// Set a value in the cache with an optional TTL.
    ///
    /// If `ttl` is `None`, the value will not expire.
    async fn set(&self, key: K, value: V, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Delete a value from the cache.
    async fn delete(&self, key: &K) -> Result<(), CacheError>;

    /// Clear all entries from the cache.
    async fn clear(&self) -> Result<(), CacheError>;

    /// Snapshot of hit/miss/expired counters.
    async fn stats(&self) -> CacheStats;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cache_trait_object() {
        let cache: Box<dyn Cache<String, String>> = Box::new(InMemoryCache::unbounded());
        cache
            .set("key".to_string(), "value".to_string(), None)
            .await
            .unwrap();
        assert_eq!(
            cache.get(&"key".to_string()).await,
            Some("value".to_string())
        );
        assert_eq!(cache.stats().await.hits, 1);
    }
}
