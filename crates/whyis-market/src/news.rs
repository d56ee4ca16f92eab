//! Company news with keyword sentiment

use crate::api::NewsProvider;
use crate::cache::{CacheKey, TtlCache};
use crate::sentiment::score_sentiment;
use crate::types::NewsArticle;
use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Arc;
use tracing::warn;

const MAX_SUMMARY_CHARS: usize = 300;

/// Provider-neutral article fields before scoring
#[derive(Debug, Clone)]
pub(crate) struct ArticleDraft {
    pub id: String,
    pub headline: String,
    pub summary: String,
    pub url: String,
    pub source: String,
    /// Unix seconds
    pub published_at: i64,
    pub image: Option<String>,
}

impl ArticleDraft {
    /// Score headline and summary together and normalize the fields
    pub(crate) fn into_article(self) -> NewsArticle {
        let scored = score_sentiment(&format!("{} {}", self.headline, self.summary));

        NewsArticle {
            id: self.id,
            headline: self.headline,
            summary: self.summary.chars().take(MAX_SUMMARY_CHARS).collect(),
            url: self.url,
            source: self.source,
            published_at: iso_timestamp(self.published_at),
            sentiment: scored.sentiment,
            sentiment_score: scored.score,
            image: self.image.filter(|i| !i.is_empty()),
        }
    }
}

fn iso_timestamp(unix_secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(unix_secs, 0)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Cached, failure-tolerant news lookups
#[derive(Clone)]
pub struct NewsService {
    provider: Arc<dyn NewsProvider>,
    cache: TtlCache<Vec<NewsArticle>>,
    max_articles: usize,
}

impl NewsService {
    pub fn new(
        provider: Arc<dyn NewsProvider>,
        cache: TtlCache<Vec<NewsArticle>>,
        max_articles: usize,
    ) -> Self {
        Self {
            provider,
            cache,
            max_articles,
        }
    }

    /// Recent articles for a ticker
    ///
    /// Provider failures are logged and produce an empty list, which is not
    /// cached so the next request retries.
    pub async fn ticker_news(&self, ticker: &str) -> Vec<NewsArticle> {
        let ticker = ticker.to_uppercase();
        let key = CacheKey::new("news", ticker.as_str());

        let result = self
            .cache
            .get_or_fetch(key, || async {
                let mut articles = self.provider.company_news(&ticker, self.max_articles).await?;
                articles.truncate(self.max_articles);
                Ok::<_, crate::MarketError>(articles)
            })
            .await;

        result.unwrap_or_else(|e| {
            warn!(
                provider = self.provider.name(),
                "Failed to fetch news for {ticker}: {e}"
            );
            Vec::new()
        })
    }
}
