//! Caching layer for market data to reduce API calls

use cached::{Cached, TimedCache};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Cache key for one tool lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub ticker: String,
    /// Tool or endpoint that produced the value
    pub endpoint: String,
    /// Remaining arguments, serialized
    pub params: String,
}

impl CacheKey {
    pub fn new(ticker: impl Into<String>, endpoint: impl Into<String>, params: impl Serialize) -> Self {
        Self {
            ticker: ticker.into(),
            endpoint: endpoint.into(),
            params: serde_json::to_string(&params).unwrap_or_default(),
        }
    }
}

/// Thread-safe TTL cache of JSON tool results
///
/// Clones share the same underlying store.
#[derive(Clone)]
pub struct StockCache {
    cache: Arc<RwLock<TimedCache<CacheKey, Value>>>,
}

impl StockCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(RwLock::new(TimedCache::with_lifespan(ttl))),
        }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Value> {
        // TimedCache evicts expired entries on read, hence the write lock
        let mut cache = self.cache.write().await;
        cache.cache_get(key).cloned()
    }

    pub async fn insert(&self, key: CacheKey, value: Value) {
        let mut cache = self.cache.write().await;
        cache.cache_set(key, value);
    }

    /// Return the cached value or run `fetcher` and cache its result
    ///
    /// Errors are not cached.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: CacheKey, fetcher: F) -> Result<Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        if let Some(value) = self.get(&key).await {
            tracing::debug!(ticker = %key.ticker, endpoint = %key.endpoint, "Cache hit");
            return Ok(value);
        }

        tracing::debug!(ticker = %key.ticker, endpoint = %key.endpoint, "Cache miss");
        let value = fetcher().await?;
        self.insert(key, value.clone()).await;
        Ok(value)
    }

    pub async fn clear(&self) {
        self.cache.write().await.cache_clear();
    }

    pub async fn len(&self) -> usize {
        self.cache.read().await.cache_size()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl std::fmt::Debug for StockCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StockCache").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_cache_insert_and_get() {
        let cache = StockCache::new(Duration::from_secs(60));
        let key = CacheKey::new("AAPL", "get_stock_price", json!({}));

        cache.insert(key.clone(), json!({"current_price": 150.0})).await;

        assert_eq!(cache.get(&key).await, Some(json!({"current_price": 150.0})));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_or_fetch_only_fetches_once() {
        let cache = StockCache::new(Duration::from_secs(60));
        let key = CacheKey::new("AAPL", "get_historical_data", json!({"period": "3mo"}));
        let mut calls = 0;

        for _ in 0..2 {
            let value = cache
                .get_or_fetch(key.clone(), || {
                    calls += 1;
                    async { Ok::<_, String>(json!({"points": 63})) }
                })
                .await
                .unwrap();
            assert_eq!(value["points"], 63);
        }
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache = StockCache::new(Duration::from_secs(60));
        let key = CacheKey::new("ZZZZ", "get_stock_price", json!({}));

        let result = cache
            .get_or_fetch(key.clone(), || async { Err::<Value, _>("not found") })
            .await;
        assert!(result.is_err());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_params_distinguish_keys() {
        let cache = StockCache::new(Duration::from_secs(60));
        cache
            .insert(CacheKey::new("AAPL", "h", json!({"period": "1mo"})), json!(1))
            .await;
        assert!(cache
            .get(&CacheKey::new("AAPL", "h", json!({"period": "1y"})))
            .await
            .is_none());

        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
