//! API clients for market data providers
//!
//! Each upstream is wrapped in a client that speaks its wire format and
//! hands back the shared types from [`crate::types`]. The traits in this
//! module are the seams the services depend on.

pub mod avanza;
pub mod finnhub;
pub mod yahoo;

pub use avanza::{AvanzaClient, AvanzaHit};
pub use finnhub::{CompanyProfile, FinnhubClient};
pub use yahoo::YahooClient;

use crate::config::MarketConfig;
use crate::error::Result;
use crate::types::{NewsArticle, QuoteSnapshot, SearchResult};
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

/// Source of quotes and intraday candles
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Latest quote plus today's 5-minute bars
    async fn snapshot(&self, ticker: &str) -> Result<QuoteSnapshot>;

    fn name(&self) -> &'static str;
}

/// Source of index and ETF day changes
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait IndexProvider: Send + Sync {
    /// Change since previous close, in percent
    async fn change_percent(&self, symbol: &str) -> Result<f64>;
}

/// Source of company news
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait NewsProvider: Send + Sync {
    /// Recent articles for a ticker, newest first, at most `limit`
    async fn company_news(&self, ticker: &str, limit: usize) -> Result<Vec<NewsArticle>>;

    fn name(&self) -> &'static str;
}

/// Ticker lookup by symbol or company name
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>>;

    fn name(&self) -> &'static str;
}

/// Company metadata used to enrich quotes
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait ProfileProvider: Send + Sync {
    async fn profile(&self, ticker: &str) -> Result<CompanyProfile>;
}

/// Shared HTTP client settings for every provider
pub(crate) fn http_client(config: &MarketConfig) -> Result<Client> {
    Ok(Client::builder()
        .timeout(config.request_timeout)
        .user_agent(config.user_agent.clone())
        .build()?)
}

/// Join an API root and a path without dropping path segments of the root
pub(crate) fn endpoint(base: &Url, path: &str) -> String {
    format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_keeps_base_path() {
        let base = Url::parse("https://finnhub.io/api/v1").unwrap();
        assert_eq!(endpoint(&base, "/quote"), "https://finnhub.io/api/v1/quote");

        let base = Url::parse("https://query2.finance.yahoo.com/").unwrap();
        assert_eq!(
            endpoint(&base, "v8/finance/chart/AAPL"),
            "https://query2.finance.yahoo.com/v8/finance/chart/AAPL"
        );
    }
}
