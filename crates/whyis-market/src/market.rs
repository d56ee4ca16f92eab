//! Index and sector context for a day's move

use crate::api::IndexProvider;
use crate::cache::{CacheKey, TtlCache};
use crate::flags::flag_emoji;
use crate::types::{IndexQuote, MarketContext, MarketMood, SectorPerformance};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

/// Threshold in percent for an index to count as up or down
const MOOD_THRESHOLD: f64 = 0.2;

struct IndexDef {
    name: &'static str,
    symbol: &'static str,
    country: &'static str,
}

const fn index(name: &'static str, symbol: &'static str, country: &'static str) -> IndexDef {
    IndexDef {
        name,
        symbol,
        country,
    }
}

/// US benchmarks; the mood is always computed over these three
const US_INDICES: &[IndexDef] = &[
    index("S&P 500", "^GSPC", "US"),
    index("Nasdaq", "^IXIC", "US"),
    index("Dow Jones", "^DJI", "US"),
];

const GLOBAL_INDICES: &[IndexDef] = &[
    index("Nikkei 225", "^N225", "JP"),
    index("FTSE 100", "^FTSE", "GB"),
    index("DAX", "^GDAXI", "DE"),
    index("CAC 40", "^FCHI", "FR"),
    index("Hang Seng", "^HSI", "HK"),
    index("OMX Stockholm 30", "^OMX", "SE"),
    index("S&P/TSX", "^GSPTSE", "CA"),
];

/// GICS sector names and common Finnhub industry names to SPDR sector ETFs
const SECTOR_ETFS: &[(&str, &str)] = &[
    ("Technology", "XLK"),
    ("Health Care", "XLV"),
    ("Financials", "XLF"),
    ("Consumer Discretionary", "XLY"),
    ("Consumer Staples", "XLP"),
    ("Industrials", "XLI"),
    ("Energy", "XLE"),
    ("Utilities", "XLU"),
    ("Real Estate", "XLRE"),
    ("Materials", "XLB"),
    ("Communication Services", "XLC"),
    ("Semiconductors", "XLK"),
    ("Pharmaceuticals", "XLV"),
    ("Biotechnology", "XLV"),
    ("Health Care Providers & Services", "XLV"),
    ("Banking", "XLF"),
    ("Insurance", "XLF"),
    ("Financial Services", "XLF"),
    ("Retail", "XLY"),
    ("Automobiles", "XLY"),
    ("Hotels, Restaurants & Leisure", "XLY"),
    ("Beverages", "XLP"),
    ("Food Products", "XLP"),
    ("Tobacco", "XLP"),
    ("Aerospace & Defense", "XLI"),
    ("Machinery", "XLI"),
    ("Airlines", "XLI"),
    ("Oil & Gas", "XLE"),
    ("Chemicals", "XLB"),
    ("Metals & Mining", "XLB"),
    ("Media", "XLC"),
    ("Telecommunication", "XLC"),
];

/// Sector ETF proxy, matched case-insensitively
pub fn sector_etf(sector: &str) -> Option<&'static str> {
    SECTOR_ETFS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(sector.trim()))
        .map(|(_, etf)| *etf)
}

/// Two or more indices down past the threshold is risk-off; otherwise two or
/// more up is risk-on
pub fn market_mood(indices: &[IndexQuote]) -> MarketMood {
    let down = indices
        .iter()
        .filter(|i| i.change_percent < -MOOD_THRESHOLD)
        .count();
    let up = indices
        .iter()
        .filter(|i| i.change_percent > MOOD_THRESHOLD)
        .count();

    if down >= 2 {
        MarketMood::RiskOff
    } else if up >= 2 {
        MarketMood::RiskOn
    } else {
        MarketMood::Neutral
    }
}

#[derive(Clone)]
pub struct MarketService {
    provider: Arc<dyn IndexProvider>,
    cache: TtlCache<MarketContext>,
}

impl MarketService {
    pub fn new(provider: Arc<dyn IndexProvider>, cache: TtlCache<MarketContext>) -> Self {
        Self { provider, cache }
    }

    /// Change for every symbol, concurrently; failures count as 0.0
    async fn changes(&self, symbols: &[&str]) -> Vec<f64> {
        join_all(symbols.iter().map(|symbol| async move {
            self.provider.change_percent(symbol).await.unwrap_or_else(|e| {
                warn!("Index change unavailable for {symbol}: {e}");
                0.0
            })
        }))
        .await
    }

    /// US index moves plus the stock's sector ETF when the sector is known
    pub async fn context(&self, sector: Option<&str>) -> MarketContext {
        let key = CacheKey::new("mktctx", sector.unwrap_or("none"));
        if let Some(context) = self.cache.get(&key).await {
            debug!("Cache hit for key: {key}");
            return context;
        }

        let etf = sector.and_then(sector_etf);
        let mut symbols: Vec<&str> = US_INDICES.iter().map(|i| i.symbol).collect();
        symbols.extend(etf);

        let changes = self.changes(&symbols).await;
        let indices: Vec<IndexQuote> = US_INDICES
            .iter()
            .zip(&changes)
            .map(|(def, change)| IndexQuote {
                name: def.name.to_string(),
                symbol: def.symbol.to_string(),
                change_percent: *change,
                flag: None,
            })
            .collect();

        let sector_perf = sector.zip(etf).map(|(sector, etf)| SectorPerformance {
            sector: sector.to_string(),
            etf: etf.to_string(),
            change_percent: changes.get(US_INDICES.len()).copied().unwrap_or(0.0),
        });

        let context = MarketContext {
            market_sentiment: market_mood(&indices),
            indices,
            sector_perf,
        };

        self.cache.insert(key, context.clone()).await;
        context
    }

    /// Global index board with country flags
    pub async fn overview(&self) -> MarketContext {
        let key = CacheKey::new("overview", "global");
        if let Some(context) = self.cache.get(&key).await {
            debug!("Cache hit for key: {key}");
            return context;
        }

        let defs: Vec<&IndexDef> = US_INDICES.iter().chain(GLOBAL_INDICES).collect();
        let symbols: Vec<&str> = defs.iter().map(|d| d.symbol).collect();
        let changes = self.changes(&symbols).await;

        let indices: Vec<IndexQuote> = defs
            .iter()
            .zip(&changes)
            .map(|(def, change)| IndexQuote {
                name: def.name.to_string(),
                symbol: def.symbol.to_string(),
                change_percent: *change,
                flag: flag_emoji(def.country),
            })
            .collect();

        let context = MarketContext {
            market_sentiment: market_mood(&indices[..US_INDICES.len()]),
            indices,
            sector_perf: None,
        };

        self.cache.insert(key, context.clone()).await;
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockIndexProvider;
    use crate::error::MarketError;
    use std::time::Duration;

    fn quotes(changes: &[f64]) -> Vec<IndexQuote> {
        changes
            .iter()
            .map(|c| IndexQuote {
                name: "x".to_string(),
                symbol: "^X".to_string(),
                change_percent: *c,
                flag: None,
            })
            .collect()
    }

    fn service(provider: MockIndexProvider) -> MarketService {
        MarketService::new(Arc::new(provider), TtlCache::new(Duration::from_secs(120)))
    }

    #[test]
    fn test_market_mood() {
        assert_eq!(market_mood(&quotes(&[-0.5, -0.3, 1.0])), MarketMood::RiskOff);
        assert_eq!(market_mood(&quotes(&[0.5, 0.3, -1.0])), MarketMood::RiskOn);
        assert_eq!(market_mood(&quotes(&[0.2, -0.2, 0.0])), MarketMood::Neutral);
        // risk-off wins when both counts reach two
        assert_eq!(market_mood(&quotes(&[-0.5, -0.5, 0.5, 0.5])), MarketMood::RiskOff);
    }

    #[test]
    fn test_sector_etf() {
        assert_eq!(sector_etf("Technology"), Some("XLK"));
        assert_eq!(sector_etf("real estate"), Some("XLRE"));
        assert_eq!(sector_etf("Semiconductors"), Some("XLK"));
        assert_eq!(sector_etf("Unknown"), None);
    }

    #[tokio::test]
    async fn test_context_with_sector() {
        let mut provider = MockIndexProvider::new();
        provider.expect_change_percent().times(4).returning(|symbol| {
            Ok(match symbol {
                "^GSPC" => 0.8,
                "^IXIC" => 1.2,
                "^DJI" => -0.1,
                "XLK" => 2.5,
                _ => 0.0,
            })
        });

        let service = service(provider);
        let context = service.context(Some("Technology")).await;

        assert_eq!(context.indices.len(), 3);
        assert_eq!(context.market_sentiment, MarketMood::RiskOn);
        let sector = context.sector_perf.clone().unwrap();
        assert_eq!(sector.etf, "XLK");
        assert!((sector.change_percent - 2.5).abs() < f64::EPSILON);

        // second call is served from cache
        assert_eq!(service.context(Some("Technology")).await, context);
    }

    #[tokio::test]
    async fn test_context_failures_count_as_flat() {
        let mut provider = MockIndexProvider::new();
        provider
            .expect_change_percent()
            .returning(|_| Err(MarketError::api("Yahoo", "HTTP 500")));

        let context = service(provider).context(Some("Unknown")).await;
        assert!(context.indices.iter().all(|i| i.change_percent == 0.0));
        assert!(context.sector_perf.is_none());
        assert_eq!(context.market_sentiment, MarketMood::Neutral);
    }

    #[tokio::test]
    async fn test_overview_has_flags_and_us_mood() {
        let mut provider = MockIndexProvider::new();
        provider.expect_change_percent().returning(|symbol| {
            Ok(if symbol.starts_with("^N") || symbol == "^FTSE" { 3.0 } else { -1.0 })
        });

        let overview = service(provider).overview().await;
        assert_eq!(overview.indices.len(), 10);
        assert!(overview.indices.iter().all(|i| i.flag.is_some()));
        assert_eq!(overview.indices[0].flag.as_deref(), Some("🇺🇸"));
        // only the US trio decides the mood
        assert_eq!(overview.market_sentiment, MarketMood::RiskOff);
    }
}
