//! Finnhub client for company news and profiles

use super::{NewsProvider, ProfileProvider, endpoint, http_client};
use crate::config::MarketConfig;
use crate::error::{MarketError, Result};
use crate::news::ArticleDraft;
use crate::types::NewsArticle;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::instrument;
use url::Url;

const PROVIDER: &str = "Finnhub";
const DEFAULT_RATE_LIMIT: NonZeroU32 = NonZeroU32::new(60).unwrap();

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Finnhub news article
#[derive(Debug, Clone, Deserialize)]
pub struct FinnhubNewsArticle {
    /// Unique article ID
    #[serde(default)]
    pub id: i64,
    /// News headline
    #[serde(default)]
    pub headline: String,
    /// Article summary
    #[serde(default)]
    pub summary: String,
    /// Article URL
    #[serde(default)]
    pub url: String,
    /// News source
    #[serde(default)]
    pub source: String,
    /// Publish time (UNIX timestamp)
    #[serde(default)]
    pub datetime: i64,
    /// Thumbnail image URL
    pub image: Option<String>,
}

/// Company profile fields used for quote enrichment
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CompanyProfile {
    pub name: Option<String>,
    /// Industry classification, used as the sector
    #[serde(rename = "finnhubIndustry")]
    pub industry: Option<String>,
    /// Market capitalization in millions
    #[serde(rename = "marketCapitalization")]
    pub market_cap_millions: Option<f64>,
}

/// Finnhub client with rate limiting
#[derive(Debug, Clone)]
pub struct FinnhubClient {
    client: Client,
    base_url: Url,
    api_key: String,
    lookback_days: i64,
    rate_limiter: SharedRateLimiter,
}

impl FinnhubClient {
    /// Create a new Finnhub client
    ///
    /// Requests are throttled to `config.finnhub_rate_limit` per minute
    /// (free tier: 60).
    pub fn new(api_key: impl Into<String>, config: &MarketConfig) -> Result<Self> {
        let quota = Quota::per_minute(
            NonZeroU32::new(config.finnhub_rate_limit).unwrap_or(DEFAULT_RATE_LIMIT),
        );

        Ok(Self {
            client: http_client(config)?,
            base_url: config.finnhub_base_url.clone(),
            api_key: api_key.into(),
            lookback_days: config.news_lookback_days,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    /// Create a client when the configuration carries a key
    pub fn from_config(config: &MarketConfig) -> Result<Option<Self>> {
        config
            .finnhub_api_key
            .as_deref()
            .map(|key| Self::new(key, config))
            .transpose()
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .get(endpoint(&self.base_url, path))
            .query(query)
            .query(&[("token", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MarketError::api(PROVIDER, format!("HTTP {status}: {body}")));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| MarketError::api(PROVIDER, format!("Failed to parse response: {e}")))
    }

    /// Get company news for a specific symbol
    ///
    /// # Arguments
    /// * `symbol` - Stock symbol (e.g., "AAPL")
    /// * `from` - Start date (YYYY-MM-DD)
    /// * `to` - End date (YYYY-MM-DD)
    #[instrument(skip(self))]
    pub async fn get_company_news(
        &self,
        symbol: &str,
        from: &str,
        to: &str,
    ) -> Result<Vec<FinnhubNewsArticle>> {
        self.get_json(
            "company-news",
            &[("symbol", symbol), ("from", from), ("to", to)],
        )
        .await
    }

    /// Get the company profile for a symbol
    #[instrument(skip(self))]
    pub async fn get_profile(&self, symbol: &str) -> Result<CompanyProfile> {
        self.get_json("stock/profile2", &[("symbol", symbol)]).await
    }
}

#[async_trait]
impl NewsProvider for FinnhubClient {
    async fn company_news(&self, ticker: &str, limit: usize) -> Result<Vec<NewsArticle>> {
        let today = Utc::now().date_naive();
        let from = today - ChronoDuration::days(self.lookback_days);

        let raw = self
            .get_company_news(
                ticker,
                &from.format("%Y-%m-%d").to_string(),
                &today.format("%Y-%m-%d").to_string(),
            )
            .await?;

        Ok(convert_articles(raw, limit))
    }

    fn name(&self) -> &'static str {
        "finnhub"
    }
}

#[async_trait]
impl ProfileProvider for FinnhubClient {
    async fn profile(&self, ticker: &str) -> Result<CompanyProfile> {
        self.get_profile(ticker).await
    }
}

fn convert_articles(raw: Vec<FinnhubNewsArticle>, limit: usize) -> Vec<NewsArticle> {
    raw.into_iter()
        .take(limit)
        .map(|item| {
            ArticleDraft {
                id: item.id.to_string(),
                headline: item.headline,
                summary: item.summary,
                url: item.url,
                source: item.source,
                published_at: item.datetime,
                image: item.image,
            }
            .into_article()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sentiment;
    use serde_json::json;

    #[test]
    fn test_finnhub_client_creation() {
        let client = FinnhubClient::new("test_key", &MarketConfig::default()).unwrap();
        assert_eq!(client.api_key, "test_key");
        assert_eq!(client.lookback_days, 7);
    }

    #[test]
    fn test_from_config_without_key() {
        assert!(FinnhubClient::from_config(&MarketConfig::default()).unwrap().is_none());
    }

    #[test]
    fn test_convert_articles() {
        let raw: Vec<FinnhubNewsArticle> = serde_json::from_value(json!([
            {
                "category": "company",
                "datetime": 1_700_000_000,
                "headline": "Chipmaker misses estimates, shares drop",
                "id": 42,
                "image": "https://example.com/i.png",
                "related": "NVDA",
                "source": "MarketWatch",
                "summary": "Guidance was lowered.",
                "url": "https://example.com/n"
            },
            { "id": 43, "headline": "Second", "datetime": 1_700_000_100 }
        ]))
        .unwrap();

        let articles = convert_articles(raw, 1);
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].id, "42");
        assert_eq!(articles[0].sentiment, Sentiment::Negative);
        assert_eq!(articles[0].image.as_deref(), Some("https://example.com/i.png"));
    }

    #[test]
    fn test_profile_deserialization() {
        let profile: CompanyProfile = serde_json::from_value(json!({
            "name": "Apple Inc",
            "finnhubIndustry": "Technology",
            "marketCapitalization": 2_900_000.5,
            "ticker": "AAPL"
        }))
        .unwrap();
        assert_eq!(profile.industry.as_deref(), Some("Technology"));

        let empty: CompanyProfile = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty, CompanyProfile::default());
    }

    #[tokio::test]
    #[ignore] // Requires API key and network access
    async fn test_live_company_news() {
        let config = MarketConfig::from_env().unwrap();
        let client = FinnhubClient::from_config(&config).unwrap().unwrap();
        let news = client.company_news("AAPL", 5).await.unwrap();
        assert!(news.len() <= 5);
    }
}
