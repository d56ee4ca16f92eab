//! Market data aggregation behind the whyis stock pages
//!
//! This crate answers one question for a ticker: why is it moving today?
//! It gathers everything a stock page needs:
//!
//! - Quotes and intraday candles from Yahoo Finance, with Avanza as a
//!   fallback for Stockholm listings
//! - Company news from Finnhub (or Yahoo), scored with a keyword sentiment
//!   model
//! - Market context: major index moves, the stock's sector ETF and an
//!   overall risk mood
//! - A short plain-English move summary from an LLM, or a template when no
//!   model is configured
//!
//! Every upstream response goes through per-endpoint TTL caches that are
//! shared across requests.
//!
//! # Example
//!
//! ```rust,ignore
//! use whyis_market::{MarketConfig, StockService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = MarketConfig::from_env()?;
//!     let service = StockService::from_config(&config)?;
//!
//!     let page = service.page("NVDA").await?;
//!     println!("{}", page.ai_summary.headline);
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod contact;
pub mod error;
pub mod flags;
pub mod market;
pub mod news;
pub mod prompts;
pub mod quotes;
pub mod search;
pub mod sentiment;
pub mod service;
pub mod summary;
pub mod types;

pub use config::{MarketConfig, MarketConfigBuilder};
pub use contact::{ContactMessage, Mailer};
pub use error::{MarketError, Result};
pub use service::{StockService, normalize_ticker};
pub use types::{
    AiSummary, Candle, IndexQuote, MarketContext, MarketMood, NewsArticle, QuoteSource,
    SearchResult, SectorPerformance, Sentiment, StockPageData, StockQuote, SummarySource,
};
