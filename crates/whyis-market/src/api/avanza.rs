//! Avanza client for Swedish stocks
//!
//! Avanza's unofficial mobile API needs no key. Avanza symbols such as
//! `"ERIC B"` are mapped to Yahoo's `.ST` form (`"ERIC-B.ST"`) so the rest
//! of the pipeline only ever sees Yahoo tickers.

use super::{QuoteProvider, SearchProvider, endpoint, http_client};
use crate::cache::{CacheKey, TtlCache};
use crate::config::MarketConfig;
use crate::error::{MarketError, Result};
use crate::types::{Candle, QuoteSnapshot, QuoteSource, SearchResult, StockQuote};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, instrument, warn};
use url::Url;

const PROVIDER: &str = "Avanza";
const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 13; Pixel 7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";
const SEARCH_LIMIT: &str = "6";
const TRADABLE_TYPES: &[&str] = &["STOCK", "CERTIFICATE"];

/// `"ERIC B"` → `"ERIC-B.ST"`
pub fn avanza_symbol_to_yahoo(symbol: &str) -> String {
    let joined = symbol.split_whitespace().collect::<Vec<_>>().join("-");
    format!("{joined}.ST")
}

/// `"ERIC-B.ST"` → `"ERIC B"`, the form Avanza search understands
pub fn yahoo_to_avanza_query(ticker: &str) -> String {
    let upper = ticker.to_uppercase();
    upper
        .strip_suffix(".ST")
        .unwrap_or(upper.as_str())
        .replace('-', " ")
}

/// True for Stockholm listings such as `"VOLV-B.ST"`
pub fn is_swedish_ticker(ticker: &str) -> bool {
    ticker.to_uppercase().ends_with(".ST")
}

/// A tradable instrument found by Avanza search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvanzaHit {
    pub orderbook_id: String,
    pub name: String,
    /// Yahoo form of the symbol, e.g. `"ERIC-B.ST"`
    pub yahoo_ticker: String,
    pub currency: String,
    pub market_list: String,
    /// Avanza instrument type (`STOCK` or `CERTIFICATE`)
    pub instrument_type: String,
}

/// Avanza API client
#[derive(Clone)]
pub struct AvanzaClient {
    client: Client,
    base_url: Url,
    hits: TtlCache<Vec<AvanzaHit>>,
}

impl AvanzaClient {
    /// Create a new Avanza client; search hits are cached for the search TTL
    pub fn new(config: &MarketConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            base_url: config.avanza_base_url.clone(),
            hits: TtlCache::new(config.cache_ttl_search),
        })
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(endpoint(&self.base_url, path))
            .header(USER_AGENT, MOBILE_USER_AGENT)
            .header(ACCEPT, "application/json")
            .header(ACCEPT_LANGUAGE, "sv-SE,sv;q=0.9,en;q=0.8")
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(MarketError::api(
                PROVIDER,
                format!("HTTP {}", response.status()),
            ));
        }
        Ok(response.json().await?)
    }

    /// Search Avanza for tradable instruments
    #[instrument(skip(self))]
    pub async fn search_hits(&self, query: &str) -> Result<Vec<AvanzaHit>> {
        let key = CacheKey::new("avanza:search", query.to_lowercase());

        self.hits
            .get_or_fetch(key, || async {
                let request = self
                    .get("_mobile/market/search/all")
                    .query(&[("query", query), ("limit", SEARCH_LIMIT)]);
                let response: SearchResponse = self.send_json(request).await?;
                Ok(parse_hits(response))
            })
            .await
    }

    /// Resolve the orderbook id for a `.ST` ticker
    ///
    /// Prefers a hit whose mapped symbol equals the ticker, else the first hit.
    pub async fn resolve_orderbook_id(&self, ticker: &str) -> Result<Option<String>> {
        let hits = self.search_hits(&yahoo_to_avanza_query(ticker)).await?;
        let id = pick_orderbook(&hits, ticker).map(|h| h.orderbook_id.clone());

        debug!("Resolved {} to Avanza orderbook {:?}", ticker, id);
        Ok(id)
    }

    /// Latest quote for an orderbook
    #[instrument(skip(self))]
    pub async fn quote(&self, orderbook_id: &str, ticker: &str) -> Result<StockQuote> {
        let request = self.get(&format!("_mobile/market/stock/{orderbook_id}"));
        let stock: StockResponse = self.send_json(request).await?;
        stock_to_quote(stock, ticker)
    }

    /// Today's 5-minute bars for an orderbook
    #[instrument(skip(self))]
    pub async fn candles(&self, orderbook_id: &str) -> Result<Vec<Candle>> {
        let request = self
            .get("ab/component/highstockchart/getchart/orderbook")
            .query(&[
                ("orderbookId", orderbook_id),
                ("chartType", "OHLC"),
                ("resolution", "FIVE_MINUTES"),
                ("timePeriod", "TODAY"),
            ]);
        let chart: ChartResponse = self.send_json(request).await?;
        Ok(chart_to_candles(chart))
    }
}

#[async_trait]
impl QuoteProvider for AvanzaClient {
    async fn snapshot(&self, ticker: &str) -> Result<QuoteSnapshot> {
        let orderbook_id = self
            .resolve_orderbook_id(ticker)
            .await?
            .ok_or_else(|| MarketError::NotFound(ticker.to_string()))?;

        let (quote, candles) = tokio::join!(
            self.quote(&orderbook_id, ticker),
            self.candles(&orderbook_id)
        );

        let candles = candles.unwrap_or_else(|e| {
            warn!("Avanza candles unavailable for {ticker}: {e}");
            Vec::new()
        });

        Ok(QuoteSnapshot {
            quote: quote?,
            candles,
        })
    }

    fn name(&self) -> &'static str {
        "avanza"
    }
}

#[async_trait]
impl SearchProvider for AvanzaClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let hits = self.search_hits(query).await?;

        Ok(hits
            .into_iter()
            .map(|hit| SearchResult {
                ticker: hit.yahoo_ticker,
                name: hit.name,
                exchange: hit.market_list,
                kind: if hit.instrument_type == "STOCK" {
                    "EQUITY".to_string()
                } else {
                    hit.instrument_type
                },
                flag: None,
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "avanza"
    }
}

// ============================================================================
// Avanza wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    link: Option<HitLink>,
    metadata: Option<HitMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HitLink {
    #[serde(rename = "type")]
    link_type: Option<String>,
    orderbook_id: Option<Value>,
    link_display: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HitMetadata {
    ticker_symbol: Option<String>,
    name: Option<String>,
    currency: Option<String>,
    market_list: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StockResponse {
    last_price: Option<f64>,
    previous_closing_price: Option<f64>,
    change: Option<f64>,
    change_percent: Option<f64>,
    total_volume_traded: Option<f64>,
    highest_price: Option<f64>,
    lowest_price: Option<f64>,
    name: Option<String>,
    sector: Option<String>,
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartResponse {
    #[serde(default)]
    ohlc_data: Vec<Vec<Option<f64>>>,
    #[serde(default)]
    volume_data: Vec<Vec<Option<f64>>>,
}

// ============================================================================
// Conversion functions
// ============================================================================

/// Orderbook ids arrive as either strings or numbers
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Hit whose Yahoo-mapped symbol equals the ticker, else the first hit
fn pick_orderbook<'a>(hits: &'a [AvanzaHit], ticker: &str) -> Option<&'a AvanzaHit> {
    hits.iter()
        .find(|h| h.yahoo_ticker.eq_ignore_ascii_case(ticker.trim()))
        .or_else(|| hits.first())
}

fn parse_hits(response: SearchResponse) -> Vec<AvanzaHit> {
    response
        .hits
        .into_iter()
        .filter_map(|hit| {
            let link = hit.link?;
            let instrument_type = link.link_type.filter(|t| TRADABLE_TYPES.contains(&t.as_str()))?;
            let orderbook_id = link.orderbook_id.as_ref().and_then(id_string)?;
            let metadata = hit.metadata.unwrap_or_default();

            let raw_symbol = metadata
                .ticker_symbol
                .or_else(|| link.link_display.clone())
                .unwrap_or_default();
            let name = metadata
                .name
                .or(link.link_display)
                .filter(|n| !n.is_empty())?;

            Some(AvanzaHit {
                orderbook_id,
                name,
                yahoo_ticker: avanza_symbol_to_yahoo(&raw_symbol),
                currency: metadata.currency.unwrap_or_else(|| "SEK".to_string()),
                market_list: metadata.market_list.unwrap_or_else(|| "Stockholm".to_string()),
                instrument_type,
            })
        })
        .collect()
}

fn stock_to_quote(stock: StockResponse, ticker: &str) -> Result<StockQuote> {
    let price = stock
        .last_price
        .filter(|p| *p > 0.0)
        .ok_or_else(|| MarketError::NotFound(ticker.to_string()))?;
    let previous_close = stock.previous_closing_price.unwrap_or(price);

    let change_percent = stock.change_percent.unwrap_or(if previous_close == 0.0 {
        0.0
    } else {
        (price - previous_close) / previous_close * 100.0
    });

    Ok(StockQuote {
        ticker: ticker.to_string(),
        name: stock.name.unwrap_or_else(|| ticker.to_string()),
        price,
        previous_close,
        change: stock.change.unwrap_or(price - previous_close),
        change_percent,
        volume: stock.total_volume_traded.unwrap_or(0.0),
        avg_volume: 0.0,
        market_cap: 0.0,
        high_52w: stock.highest_price.unwrap_or(0.0),
        low_52w: stock.lowest_price.unwrap_or(0.0),
        sector: stock.sector.unwrap_or_else(|| "Unknown".to_string()),
        exchange: "Stockholm".to_string(),
        currency: stock.currency.unwrap_or_else(|| "SEK".to_string()),
        timestamp: Utc::now().timestamp_millis(),
        source: QuoteSource::Avanza,
    })
}

/// Joins volume onto OHLC rows by millisecond timestamp, then converts to seconds
fn chart_to_candles(chart: ChartResponse) -> Vec<Candle> {
    let volumes: HashMap<i64, f64> = chart
        .volume_data
        .iter()
        .filter_map(|row| match row.as_slice() {
            [Some(ts), Some(volume), ..] => Some((*ts as i64, *volume)),
            _ => None,
        })
        .collect();

    chart
        .ohlc_data
        .iter()
        .filter_map(|row| match row.as_slice() {
            [Some(ts), Some(open), Some(high), Some(low), Some(close), ..] if *close > 0.0 => {
                let ts = *ts as i64;
                Some(Candle {
                    time: ts / 1000,
                    open: *open,
                    high: *high,
                    low: *low,
                    close: *close,
                    volume: volumes.get(&ts).copied().unwrap_or(0.0),
                })
            }
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_symbol_mapping() {
        assert_eq!(avanza_symbol_to_yahoo("ERIC B"), "ERIC-B.ST");
        assert_eq!(avanza_symbol_to_yahoo(" ABB "), "ABB.ST");
        assert_eq!(yahoo_to_avanza_query("volv-b.st"), "VOLV B");
        assert!(is_swedish_ticker("eric-b.st"));
        assert!(!is_swedish_ticker("AAPL"));
    }

    #[test]
    fn test_parse_hits() {
        let response: SearchResponse = serde_json::from_value(json!({
            "hits": [
                {
                    "link": { "type": "STOCK", "orderbookId": "5240", "linkDisplay": "ERIC B" },
                    "metadata": { "tickerSymbol": "ERIC B", "name": "Ericsson B", "currency": "SEK", "marketList": "Large Cap Stockholm" }
                },
                {
                    "link": { "type": "FUND", "orderbookId": "1", "linkDisplay": "Fund" }
                },
                {
                    "link": { "type": "CERTIFICATE", "orderbookId": 77, "linkDisplay": "BULL ERIC X5" }
                },
                {
                    "link": { "type": "STOCK", "orderbookId": "", "linkDisplay": "NOID" }
                }
            ]
        }))
        .unwrap();

        let hits = parse_hits(response);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].orderbook_id, "5240");
        assert_eq!(hits[0].yahoo_ticker, "ERIC-B.ST");
        assert_eq!(hits[0].market_list, "Large Cap Stockholm");
        assert_eq!(hits[1].orderbook_id, "77");
        assert_eq!(hits[1].name, "BULL ERIC X5");
        assert_eq!(hits[1].currency, "SEK");
    }

    fn hit(id: &str, ticker: &str) -> AvanzaHit {
        AvanzaHit {
            orderbook_id: id.to_string(),
            name: ticker.to_string(),
            yahoo_ticker: ticker.to_string(),
            currency: "SEK".to_string(),
            market_list: String::new(),
            instrument_type: "STOCK".to_string(),
        }
    }

    #[test]
    fn test_pick_orderbook_prefers_exact_symbol() {
        let hits = vec![hit("5239", "ERIC-A.ST"), hit("5240", "ERIC-B.ST")];
        assert_eq!(pick_orderbook(&hits, "eric-b.st").unwrap().orderbook_id, "5240");
    }

    #[test]
    fn test_pick_orderbook_falls_back_to_first_hit() {
        let hits = vec![hit("77", "BULL-ERIC-X5.ST"), hit("5240", "ERIC-B.ST")];
        assert_eq!(pick_orderbook(&hits, "ERIC.ST").unwrap().orderbook_id, "77");
        assert!(pick_orderbook(&[], "ERIC-B.ST").is_none());
    }

    #[test]
    fn test_stock_to_quote() {
        let stock: StockResponse = serde_json::from_value(json!({
            "lastPrice": 66.0,
            "previousClosingPrice": 60.0,
            "totalVolumeTraded": 1_234_567.0,
            "highestPrice": 70.0,
            "lowestPrice": 50.0,
            "name": "Ericsson B",
            "sector": "Telecom"
        }))
        .unwrap();

        let quote = stock_to_quote(stock, "ERIC-B.ST").unwrap();
        assert!((quote.change - 6.0).abs() < 1e-9);
        assert!((quote.change_percent - 10.0).abs() < 1e-9);
        assert_eq!(quote.currency, "SEK");
        assert_eq!(quote.exchange, "Stockholm");
        assert_eq!(quote.source, QuoteSource::Avanza);
    }

    #[test]
    fn test_stock_without_price_is_not_found() {
        let stock: StockResponse = serde_json::from_value(json!({ "name": "Ghost" })).unwrap();
        assert!(stock_to_quote(stock, "GHOST.ST").unwrap_err().is_not_found());
    }

    #[test]
    fn test_chart_to_candles() {
        let chart: ChartResponse = serde_json::from_value(json!({
            "ohlcData": [
                [1_700_000_000_000_i64, 60.0, 61.0, 59.5, 60.5],
                [1_700_000_300_000_i64, 60.5, 61.5, 60.0, 0.0],
                [1_700_000_600_000_i64, 60.5, 62.0, 60.2, 61.8]
            ],
            "volumeData": [
                [1_700_000_000_000_i64, 1500.0],
                [1_700_000_300_000_i64, 200.0]
            ]
        }))
        .unwrap();

        let candles = chart_to_candles(chart);
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].time, 1_700_000_000);
        assert!((candles[0].volume - 1500.0).abs() < f64::EPSILON);
        assert!(candles[1].volume.abs() < f64::EPSILON);
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_live_resolve_orderbook() {
        let client = AvanzaClient::new(&MarketConfig::default()).unwrap();
        let id = client.resolve_orderbook_id("ERIC-B.ST").await.unwrap();
        assert!(id.is_some());
    }
}
