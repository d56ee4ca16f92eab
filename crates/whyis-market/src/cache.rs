//! In-memory TTL caches for market data
//!
//! Entries live for the lifetime of the process; expiry is checked on read
//! and an expired entry is dropped at that point. There is no other
//! eviction.

use crate::config::MarketConfig;
use crate::types::{AiSummary, Candle, MarketContext, NewsArticle, SearchResult, StockQuote};
use cached::{Cached, TimedCache};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Cache key made of an endpoint and a symbol, displayed as `endpoint:SYMBOL`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Data kind, e.g. `quote` or `news`
    pub endpoint: String,
    /// Ticker or other discriminator
    pub symbol: String,
}

impl CacheKey {
    /// Create a new cache key
    pub fn new(endpoint: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            symbol: symbol.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.endpoint, self.symbol)
    }
}

/// Thread-safe cache with a single TTL for every entry
pub struct TtlCache<V> {
    cache: Arc<RwLock<TimedCache<CacheKey, V>>>,
}

impl<V: Clone> TtlCache<V> {
    /// Create a new cache with specified TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(RwLock::new(TimedCache::with_lifespan(ttl))),
        }
    }

    /// Get a value, `None` when absent or expired
    pub async fn get(&self, key: &CacheKey) -> Option<V> {
        // TimedCache removes stale entries on lookup, which needs the write half
        let mut cache = self.cache.write().await;
        cache.cache_get(key).cloned()
    }

    /// Insert a value, replacing any previous entry and its expiry
    pub async fn insert(&self, key: CacheKey, value: V) {
        let mut cache = self.cache.write().await;
        let _ = cache.cache_set(key, value);
    }

    /// Get or fetch a value using the provided fetcher function
    ///
    /// Only successful fetches are stored.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: CacheKey, fetcher: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key).await {
            tracing::debug!("Cache hit for key: {key}");
            return Ok(value);
        }

        tracing::debug!("Cache miss for key: {key}");

        let value = fetcher().await?;
        self.insert(key, value.clone()).await;

        Ok(value)
    }

    /// Invalidate a specific cache entry
    pub async fn invalidate(&self, key: &CacheKey) {
        let mut cache = self.cache.write().await;
        let _ = cache.cache_remove(key);
    }

    /// Clear all cached entries
    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        cache.cache_clear();
    }

    /// Number of stored entries, including ones that expired but were not read since
    pub async fn len(&self) -> usize {
        let cache = self.cache.read().await;
        cache.cache_size()
    }

    /// Check if the cache is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<V> Clone for TtlCache<V> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}

/// A summary stored together with the move it explained
#[derive(Debug, Clone)]
pub struct CachedSummary {
    pub summary: AiSummary,
    /// Change percent of the quote the summary was generated for
    pub change_percent: f64,
}

/// One cache tier per data kind
#[derive(Clone)]
pub struct CacheManager {
    pub quotes: TtlCache<StockQuote>,
    pub candles: TtlCache<Vec<Candle>>,
    pub news: TtlCache<Vec<NewsArticle>>,
    pub summaries: TtlCache<CachedSummary>,
    pub market: TtlCache<MarketContext>,
    pub search: TtlCache<Vec<SearchResult>>,
}

impl CacheManager {
    /// Create a cache manager with TTLs taken from the configuration
    pub fn new(config: &MarketConfig) -> Self {
        Self {
            quotes: TtlCache::new(config.cache_ttl_quote),
            candles: TtlCache::new(config.cache_ttl_candles),
            news: TtlCache::new(config.cache_ttl_news),
            summaries: TtlCache::new(config.cache_ttl_summary),
            market: TtlCache::new(config.cache_ttl_market),
            search: TtlCache::new(config.cache_ttl_search),
        }
    }

    /// Create a cache manager with the default TTLs
    pub fn default_config() -> Self {
        Self::new(&MarketConfig::default())
    }

    /// Clear all caches
    pub async fn clear_all(&self) {
        self.quotes.clear().await;
        self.candles.clear().await;
        self.news.clear().await;
        self.summaries.clear().await;
        self.market.clear().await;
        self.search.clear().await;
    }
}
