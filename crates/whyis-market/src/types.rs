//! Uniform data model shared by every data source
//!
//! All types serialize with camelCase field names, the shape the JSON API
//! returns to clients.

use serde::{Deserialize, Serialize};

/// Latest price and related fields for a ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockQuote {
    pub ticker: String,
    pub name: String,
    pub price: f64,
    pub previous_close: f64,
    /// Absolute change since previous close
    pub change: f64,
    /// Change in percent, e.g. `-3.27`
    pub change_percent: f64,
    pub volume: f64,
    pub avg_volume: f64,
    pub market_cap: f64,
    #[serde(rename = "high52w")]
    pub high_52w: f64,
    #[serde(rename = "low52w")]
    pub low_52w: f64,
    pub sector: String,
    pub exchange: String,
    pub currency: String,
    /// Unix milliseconds
    pub timestamp: i64,
    /// Provider that produced the quote
    pub source: QuoteSource,
}

impl StockQuote {
    /// True when the stock is flat or up on the day
    pub fn is_up(&self) -> bool {
        self.change_percent >= 0.0
    }

    /// `"up"` or `"down"`
    pub fn direction(&self) -> &'static str {
        if self.is_up() { "up" } else { "down" }
    }
}

/// Provider a quote came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteSource {
    Yahoo,
    Avanza,
}

/// One 5-minute OHLCV bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Unix seconds
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Quote and intraday bars fetched together
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteSnapshot {
    pub quote: StockQuote,
    pub candles: Vec<Candle>,
}

/// Coarse sentiment label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    pub id: String,
    pub headline: String,
    /// At most 300 characters
    pub summary: String,
    pub url: String,
    pub source: String,
    /// ISO-8601
    pub published_at: String,
    pub sentiment: Sentiment,
    /// Normalized score in `-1.0..=1.0`
    pub sentiment_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexQuote {
    pub name: String,
    pub symbol: String,
    pub change_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorPerformance {
    pub sector: String,
    /// Sector ETF used as the proxy
    pub etf: String,
    pub change_percent: f64,
}

/// Overall market mood derived from index moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarketMood {
    RiskOn,
    RiskOff,
    Neutral,
}

impl MarketMood {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RiskOn => "risk-on",
            Self::RiskOff => "risk-off",
            Self::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketContext {
    pub indices: Vec<IndexQuote>,
    pub sector_perf: Option<SectorPerformance>,
    pub market_sentiment: MarketMood,
}

/// How a summary was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummarySource {
    Llm,
    Template,
}

/// Plain-English explanation of the day's move
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSummary {
    pub headline: String,
    pub summary: String,
    pub key_reasons: Vec<String>,
    /// ISO-8601
    pub generated_at: String,
    pub cached: bool,
    pub source: SummarySource,
}

/// Full payload for one stock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockPageData {
    pub quote: StockQuote,
    pub candles: Vec<Candle>,
    pub news: Vec<NewsArticle>,
    pub market_context: MarketContext,
    pub ai_summary: AiSummary,
    pub generated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub ticker: String,
    pub name: String,
    pub exchange: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
}
