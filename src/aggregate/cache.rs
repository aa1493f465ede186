use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use lru::LruCache;
use tokio::time::Instant;

use super::query::QueryKey;
use crate::api::ApiError;

/// Default freshness window for cached results (10 hours)
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(10 * 60 * 60);

struct Entry<V> {
    value: Arc<V>,
    fetched_at: Instant,
}

/// Keyed cache of successful query results.
///
/// Entries are fresh for `stale_time` after they were fetched; a stale entry
/// is refetched on next use. Failures are never cached. The lock is only
/// held for map operations, never across an `.await`.
pub struct QueryCache<V> {
    entries: Mutex<LruCache<QueryKey, Entry<V>>>,
    stale_time: Duration,
}

impl<V> std::fmt::Debug for QueryCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("len", &self.len())
            .field("stale_time", &self.stale_time)
            .finish()
    }
}

impl<V> QueryCache<V> {
    pub fn new(capacity: NonZeroUsize, stale_time: Duration) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            stale_time,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<QueryKey, Entry<V>>> {
        // A panic while holding the lock cannot leave the map half-updated
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The cached value for `key` if it is still fresh.
    pub fn get_fresh(&self, key: &QueryKey) -> Option<Arc<V>> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.fetched_at.elapsed() < self.stale_time => {
                Some(Arc::clone(&entry.value))
            }
            _ => None,
        }
    }

    pub fn insert(&self, key: QueryKey, value: V) -> Arc<V> {
        let value = Arc::new(value);
        self.lock().put(
            key,
            Entry {
                value: Arc::clone(&value),
                fetched_at: Instant::now(),
            },
        );
        value
    }

    pub fn invalidate(&self, key: &QueryKey) {
        self.lock().pop(key);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serve `key` from cache when fresh, otherwise run `fetch` and cache a
    /// successful result.
    pub async fn get_or_fetch<F, Fut>(&self, key: QueryKey, fetch: F) -> Result<Arc<V>, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, ApiError>>,
    {
        if let Some(value) = self.get_fresh(&key) {
            tracing::debug!(key = %key, "Query cache hit");
            return Ok(value);
        }

        tracing::debug!(key = %key, "Query cache miss");
        let value = fetch().await?;
        Ok(self.insert(key, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cache(capacity: usize) -> QueryCache<String> {
        QueryCache::new(NonZeroUsize::new(capacity).unwrap(), DEFAULT_STALE_TIME)
    }

    #[tokio::test]
    async fn test_get_or_fetch_caches_success() {
        let cache = cache(8);
        let calls = AtomicUsize::new(0);
        let key = QueryKey::new(["categories"]);

        for _ in 0..3 {
            let value = cache
                .get_or_fetch(key.clone(), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("fresh".to_string())
                })
                .await
                .unwrap();
            assert_eq!(*value, "fresh");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_not_cached() {
        let cache = cache(8);
        let key = QueryKey::new(["articles", "x"]);

        let result = cache
            .get_or_fetch(key.clone(), || async { Err(ApiError::HttpStatus(503)) })
            .await;
        assert!(result.is_err());
        assert!(cache.is_empty());

        let value = cache
            .get_or_fetch(key, || async { Ok("recovered".to_string()) })
            .await
            .unwrap();
        assert_eq!(*value, "recovered");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_entry_refetched() {
        let cache = cache(8);
        let key = QueryKey::new(["articles", "y"]);
        cache.insert(key.clone(), "old".to_string());

        tokio::time::advance(DEFAULT_STALE_TIME - Duration::from_secs(1)).await;
        assert_eq!(cache.get_fresh(&key).as_deref().map(String::as_str), Some("old"));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get_fresh(&key).is_none());

        let value = cache
            .get_or_fetch(key, || async { Ok("new".to_string()) })
            .await
            .unwrap();
        assert_eq!(*value, "new");
    }

    #[test]
    fn test_capacity_evicts_least_recent() {
        let cache = cache(2);
        let a = QueryKey::new(["a"]);
        let b = QueryKey::new(["b"]);
        let c = QueryKey::new(["c"]);
        cache.insert(a.clone(), "a".to_string());
        cache.insert(b.clone(), "b".to_string());
        // Touch a so b becomes least recently used
        assert!(cache.get_fresh(&a).is_some());
        cache.insert(c.clone(), "c".to_string());

        assert_eq!(cache.len(), 2);
        assert!(cache.get_fresh(&b).is_none());
        assert!(cache.get_fresh(&a).is_some());
        assert!(cache.get_fresh(&c).is_some());
    }

    #[test]
    fn test_invalidate_and_clear() {
        let cache = cache(4);
        let a = QueryKey::new(["a"]);
        cache.insert(a.clone(), "a".to_string());
        cache.insert(QueryKey::new(["b"]), "b".to_string());
        cache.invalidate(&a);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
