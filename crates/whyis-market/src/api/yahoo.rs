//! Yahoo Finance API client
//!
//! Uses the unofficial JSON endpoints directly:
//! - `v8/finance/chart/{ticker}` for quote metadata and 5-minute bars
//! - `v1/finance/search` for ticker lookup and news headlines

use super::{IndexProvider, NewsProvider, QuoteProvider, SearchProvider, endpoint, http_client};
use crate::config::MarketConfig;
use crate::error::{MarketError, Result};
use crate::news::ArticleDraft;
use crate::types::{Candle, NewsArticle, QuoteSnapshot, QuoteSource, SearchResult, StockQuote};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

const PROVIDER: &str = "Yahoo";

/// Quote types kept in search results
const SEARCHABLE_TYPES: &[&str] = &["EQUITY", "ETF"];
const SEARCH_QUOTES_COUNT: &str = "7";
const MAX_SEARCH_RESULTS: usize = 6;

/// Yahoo Finance API client
#[derive(Debug, Clone)]
pub struct YahooClient {
    client: Client,
    base_url: Url,
}

impl YahooClient {
    /// Create a new Yahoo Finance client
    pub fn new(config: &MarketConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            base_url: config.yahoo_base_url.clone(),
        })
    }

    /// Fetch the raw intraday chart for a ticker
    #[instrument(skip(self))]
    async fn chart(&self, ticker: &str) -> Result<ChartResponse> {
        let encoded: String = url::form_urlencoded::byte_serialize(ticker.as_bytes()).collect();
        let url = endpoint(&self.base_url, &format!("v8/finance/chart/{encoded}"));

        let response = self
            .client
            .get(&url)
            .query(&[("interval", "5m"), ("range", "1d")])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(MarketError::NotFound(ticker.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MarketError::api(PROVIDER, format!("HTTP {status}: {body}")));
        }

        Ok(response.json().await?)
    }

    /// Raw search call shared by ticker search and news
    async fn raw_search(&self, query: &str, quotes: &str, news: &str) -> Result<SearchResponse> {
        let url = endpoint(&self.base_url, "v1/finance/search");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", query),
                ("quotesCount", quotes),
                ("newsCount", news),
                ("enableFuzzyQuery", "true"),
                ("quotesQueryId", "tss_match_phrase_query"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MarketError::api(
                PROVIDER,
                format!("search failed with HTTP {}", response.status()),
            ));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl QuoteProvider for YahooClient {
    async fn snapshot(&self, ticker: &str) -> Result<QuoteSnapshot> {
        let chart = self.chart(ticker).await?;
        parse_chart(ticker, chart)
    }

    fn name(&self) -> &'static str {
        "yahoo"
    }
}

#[async_trait]
impl IndexProvider for YahooClient {
    async fn change_percent(&self, symbol: &str) -> Result<f64> {
        let snapshot = self.snapshot(symbol).await?;
        Ok(snapshot.quote.change_percent)
    }
}

#[async_trait]
impl SearchProvider for YahooClient {
    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let response = self.raw_search(query, SEARCH_QUOTES_COUNT, "0").await?;
        Ok(search_results(response))
    }

    fn name(&self) -> &'static str {
        "yahoo"
    }
}

#[async_trait]
impl NewsProvider for YahooClient {
    #[instrument(skip(self))]
    async fn company_news(&self, ticker: &str, limit: usize) -> Result<Vec<NewsArticle>> {
        let response = self.raw_search(ticker, "0", &limit.to_string()).await?;
        debug!("Yahoo returned {} news items for {}", response.news.len(), ticker);
        Ok(news_articles(response, limit))
    }

    fn name(&self) -> &'static str {
        "yahoo"
    }
}

// ============================================================================
// Yahoo wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    currency: Option<String>,
    regular_market_price: Option<f64>,
    chart_previous_close: Option<f64>,
    previous_close: Option<f64>,
    long_name: Option<String>,
    short_name: Option<String>,
    full_exchange_name: Option<String>,
    exchange_name: Option<String>,
    fifty_two_week_high: Option<f64>,
    fifty_two_week_low: Option<f64>,
    regular_market_volume: Option<f64>,
    regular_market_time: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteBars>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteBars {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    quotes: Vec<SearchQuote>,
    #[serde(default)]
    news: Vec<SearchNews>,
}

#[derive(Debug, Deserialize)]
struct SearchQuote {
    symbol: Option<String>,
    longname: Option<String>,
    shortname: Option<String>,
    #[serde(rename = "exchDisp")]
    exch_disp: Option<String>,
    exchange: Option<String>,
    #[serde(rename = "quoteType")]
    quote_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchNews {
    uuid: Option<String>,
    title: Option<String>,
    publisher: Option<String>,
    link: Option<String>,
    provider_publish_time: Option<i64>,
    thumbnail: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    #[serde(default)]
    resolutions: Vec<ThumbnailResolution>,
}

#[derive(Debug, Deserialize)]
struct ThumbnailResolution {
    url: String,
}

// ============================================================================
// Conversion functions
// ============================================================================

fn parse_chart(ticker: &str, response: ChartResponse) -> Result<QuoteSnapshot> {
    let result = response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| MarketError::NotFound(ticker.to_string()))?;

    let meta = result.meta;
    let price = meta
        .regular_market_price
        .filter(|p| *p > 0.0)
        .ok_or_else(|| MarketError::NotFound(ticker.to_string()))?;

    let previous_close = meta
        .chart_previous_close
        .or(meta.previous_close)
        .unwrap_or(price);
    let change = price - previous_close;
    let change_percent = if previous_close == 0.0 {
        0.0
    } else {
        change / previous_close * 100.0
    };

    let candles = build_candles(&result.timestamp, result.indicators.quote.first());
    let volume = meta
        .regular_market_volume
        .unwrap_or_else(|| candles.iter().map(|c| c.volume).sum());

    let quote = StockQuote {
        ticker: ticker.to_string(),
        name: meta
            .long_name
            .or(meta.short_name)
            .unwrap_or_else(|| ticker.to_string()),
        price,
        previous_close,
        change,
        change_percent,
        volume,
        avg_volume: 0.0,
        market_cap: 0.0,
        high_52w: meta.fifty_two_week_high.unwrap_or(0.0),
        low_52w: meta.fifty_two_week_low.unwrap_or(0.0),
        sector: "Unknown".to_string(),
        exchange: meta
            .full_exchange_name
            .or(meta.exchange_name)
            .unwrap_or_default(),
        currency: meta.currency.unwrap_or_else(|| "USD".to_string()),
        timestamp: meta
            .regular_market_time
            .map_or_else(|| Utc::now().timestamp_millis(), |t| t * 1000),
        source: QuoteSource::Yahoo,
    };

    Ok(QuoteSnapshot { quote, candles })
}

/// Bars with a missing or non-positive close are dropped
fn build_candles(timestamps: &[i64], bars: Option<&QuoteBars>) -> Vec<Candle> {
    let Some(bars) = bars else {
        return Vec::new();
    };
    let at = |series: &[Option<f64>], i: usize| series.get(i).copied().flatten();

    timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, &time)| {
            let close = at(&bars.close, i).filter(|c| *c > 0.0)?;
            Some(Candle {
                time,
                open: at(&bars.open, i).unwrap_or(close),
                high: at(&bars.high, i).unwrap_or(close),
                low: at(&bars.low, i).unwrap_or(close),
                close,
                volume: at(&bars.volume, i).unwrap_or(0.0),
            })
        })
        .collect()
}

fn search_results(response: SearchResponse) -> Vec<SearchResult> {
    response
        .quotes
        .into_iter()
        .filter(|q| {
            q.quote_type
                .as_deref()
                .is_some_and(|t| SEARCHABLE_TYPES.contains(&t))
        })
        .take(MAX_SEARCH_RESULTS)
        .filter_map(|q| {
            let ticker = q.symbol.filter(|s| !s.is_empty())?;
            Some(SearchResult {
                name: q
                    .longname
                    .or(q.shortname)
                    .unwrap_or_else(|| ticker.clone()),
                exchange: q.exch_disp.or(q.exchange).unwrap_or_default(),
                kind: q.quote_type.unwrap_or_default(),
                flag: None,
                ticker,
            })
        })
        .collect()
}

fn news_articles(response: SearchResponse, limit: usize) -> Vec<NewsArticle> {
    response
        .news
        .into_iter()
        .filter_map(|item| {
            let headline = item.title.filter(|t| !t.is_empty())?;
            let image = item
                .thumbnail
                .and_then(|t| t.resolutions.into_iter().next())
                .map(|r| r.url);
            Some(
                ArticleDraft {
                    id: item.uuid.unwrap_or_default(),
                    headline,
                    summary: String::new(),
                    url: item.link.unwrap_or_default(),
                    source: item.publisher.unwrap_or_else(|| "Yahoo Finance".to_string()),
                    published_at: item.provider_publish_time.unwrap_or_default(),
                    image,
                }
                .into_article(),
            )
        })
        .take(limit)
        .collect()
}
