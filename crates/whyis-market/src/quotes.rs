//! Quotes and intraday candles with provider fallback
//!
//! Yahoo is the primary source. When it fails for a Stockholm ticker the
//! Avanza fallback is tried; if that fails too the caller sees Yahoo's error.

use crate::api::avanza::is_swedish_ticker;
use crate::api::{ProfileProvider, QuoteProvider};
use crate::cache::{CacheKey, TtlCache};
use crate::error::Result;
use crate::types::{Candle, QuoteSnapshot, StockQuote};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct QuoteService {
    primary: Arc<dyn QuoteProvider>,
    fallback: Option<Arc<dyn QuoteProvider>>,
    profiles: Option<Arc<dyn ProfileProvider>>,
    quotes: TtlCache<StockQuote>,
    candles: TtlCache<Vec<Candle>>,
}

impl QuoteService {
    pub fn new(
        primary: Arc<dyn QuoteProvider>,
        quotes: TtlCache<StockQuote>,
        candles: TtlCache<Vec<Candle>>,
    ) -> Self {
        Self {
            primary,
            fallback: None,
            profiles: None,
            quotes,
            candles,
        }
    }

    /// Provider used for `.ST` tickers when the primary fails
    pub fn with_fallback(mut self, fallback: Arc<dyn QuoteProvider>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Company profiles used to fill in name, sector and market cap
    pub fn with_profiles(mut self, profiles: Arc<dyn ProfileProvider>) -> Self {
        self.profiles = Some(profiles);
        self
    }

    /// Latest quote for an uppercase ticker
    pub async fn quote(&self, ticker: &str) -> Result<StockQuote> {
        let key = CacheKey::new("quote", ticker);
        if let Some(quote) = self.quotes.get(&key).await {
            debug!("Cache hit for key: {key}");
            return Ok(quote);
        }

        Ok(self.refresh(ticker).await?.quote)
    }

    /// Today's 5-minute bars; an empty list when nothing is available
    pub async fn candles(&self, ticker: &str) -> Vec<Candle> {
        let key = CacheKey::new("candles", ticker);
        if let Some(candles) = self.candles.get(&key).await {
            debug!("Cache hit for key: {key}");
            return candles;
        }

        match self.refresh(ticker).await {
            Ok(snapshot) => snapshot.candles,
            Err(e) => {
                warn!("Candles unavailable for {ticker}: {e}");
                Vec::new()
            }
        }
    }

    /// Fetch a fresh snapshot and store both halves
    async fn refresh(&self, ticker: &str) -> Result<QuoteSnapshot> {
        let mut snapshot = self.fetch_with_fallback(ticker).await?;
        self.enrich(&mut snapshot.quote).await;

        // an empty bar list is cached too, so a closed market costs one fetch
        self.quotes
            .insert(CacheKey::new("quote", ticker), snapshot.quote.clone())
            .await;
        self.candles
            .insert(CacheKey::new("candles", ticker), snapshot.candles.clone())
            .await;

        Ok(snapshot)
    }

    async fn fetch_with_fallback(&self, ticker: &str) -> Result<QuoteSnapshot> {
        let primary_err = match self.primary.snapshot(ticker).await {
            Ok(snapshot) => return Ok(snapshot),
            Err(e) => e,
        };

        let Some(fallback) = self.fallback.as_ref().filter(|_| is_swedish_ticker(ticker)) else {
            return Err(primary_err);
        };

        warn!(
            "{} failed for {ticker} ({primary_err}), trying {}",
            self.primary.name(),
            fallback.name()
        );

        fallback.snapshot(ticker).await.map_err(|fallback_err| {
            warn!("{} fallback failed for {ticker}: {fallback_err}", fallback.name());
            primary_err
        })
    }

    /// Best effort; failures leave the quote untouched
    async fn enrich(&self, quote: &mut StockQuote) {
        let Some(profiles) = &self.profiles else {
            return;
        };

        match profiles.profile(&quote.ticker).await {
            Ok(profile) => {
                if let Some(name) = profile.name.filter(|n| !n.is_empty()) {
                    quote.name = name;
                }
                if let Some(industry) = profile.industry.filter(|i| !i.is_empty()) {
                    quote.sector = industry;
                }
                if let Some(cap) = profile.market_cap_millions.filter(|c| *c > 0.0) {
                    quote.market_cap = cap * 1_000_000.0;
                }
            }
            Err(e) => warn!("Profile enrichment failed for {}: {e}", quote.ticker),
        }
    }
}
