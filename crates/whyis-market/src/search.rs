//! Ticker search across providers

use crate::api::SearchProvider;
use crate::cache::{CacheKey, TtlCache};
use crate::flags::flag_for_ticker;
use crate::types::SearchResult;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct SearchService {
    providers: Vec<Arc<dyn SearchProvider>>,
    cache: TtlCache<Vec<SearchResult>>,
}

impl SearchService {
    /// Results are merged in provider order
    pub fn new(providers: Vec<Arc<dyn SearchProvider>>, cache: TtlCache<Vec<SearchResult>>) -> Self {
        Self { providers, cache }
    }

    /// Look up tickers by symbol or company name
    ///
    /// Never fails: a provider error contributes no results.
    pub async fn search(&self, query: &str) -> Vec<SearchResult> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let key = CacheKey::new("search", query.to_lowercase());
        if let Some(results) = self.cache.get(&key).await {
            return results;
        }

        let batches = join_all(self.providers.iter().map(|provider| async move {
            provider.search(query).await.unwrap_or_else(|e| {
                warn!(provider = provider.name(), "Search failed for {query:?}: {e}");
                Vec::new()
            })
        }))
        .await;

        let mut seen = HashSet::new();
        let results: Vec<SearchResult> = batches
            .into_iter()
            .flatten()
            .filter(|r| seen.insert(r.ticker.to_uppercase()))
            .map(|r| SearchResult {
                flag: flag_for_ticker(&r.ticker),
                ..r
            })
            .collect();

        if !results.is_empty() {
            self.cache.insert(key, results.clone()).await;
        }
        results
    }
}
