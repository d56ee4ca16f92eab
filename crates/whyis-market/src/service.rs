//! Page assembly and the service facade used by the HTTP layer

use crate::api::{AvanzaClient, FinnhubClient, NewsProvider, SearchProvider, YahooClient};
use crate::cache::CacheManager;
use crate::config::MarketConfig;
use crate::contact::{ContactMessage, Mailer, ResendMailer};
use crate::error::{MarketError, Result};
use crate::market::MarketService;
use crate::news::NewsService;
use crate::quotes::QuoteService;
use crate::search::SearchService;
use crate::summary::{SummaryGenerator, SummarySettings};
use crate::types::{MarketContext, SearchResult, StockPageData};
use chrono::{SecondsFormat, Utc};
use std::sync::Arc;
use tracing::{info, instrument};
use whyis_llm::LLMProvider;
use whyis_llm::providers::{OpenAIConfig, OpenAIProvider};

const MAX_TICKER_LEN: usize = 15;

/// Uppercase a ticker and check it against Yahoo's symbol alphabet
pub fn normalize_ticker(raw: &str) -> Result<String> {
    let ticker = raw.trim().to_uppercase();
    let valid = !ticker.is_empty()
        && ticker.len() <= MAX_TICKER_LEN
        && ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='));

    if valid {
        Ok(ticker)
    } else {
        Err(MarketError::InvalidSymbol(raw.to_string()))
    }
}

/// Everything the API exposes, wired over shared caches
#[derive(Clone)]
pub struct StockService {
    quotes: QuoteService,
    news: NewsService,
    market: MarketService,
    summaries: SummaryGenerator,
    search: SearchService,
    mailer: Option<Arc<dyn Mailer>>,
}

impl StockService {
    /// Assemble a service from its parts
    pub fn new(
        quotes: QuoteService,
        news: NewsService,
        market: MarketService,
        summaries: SummaryGenerator,
        search: SearchService,
    ) -> Self {
        Self {
            quotes,
            news,
            market,
            summaries,
            search,
            mailer: None,
        }
    }

    /// Enable the contact relay
    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    /// Build the production wiring from configuration
    ///
    /// Yahoo serves quotes, indices and search. Finnhub supplies news and
    /// company profiles when a key is set, otherwise news comes from Yahoo.
    /// Avanza backs up Stockholm tickers and adds Swedish search hits.
    pub fn from_config(config: &MarketConfig) -> Result<Self> {
        config.validate()?;

        let caches = CacheManager::new(config);
        let yahoo = Arc::new(YahooClient::new(config)?);
        let avanza = Arc::new(AvanzaClient::new(config)?);
        let finnhub = FinnhubClient::from_config(config)?.map(Arc::new);

        let mut quotes = QuoteService::new(yahoo.clone(), caches.quotes.clone(), caches.candles.clone());
        if config.avanza_fallback {
            quotes = quotes.with_fallback(avanza.clone());
        }

        let news_provider: Arc<dyn NewsProvider> = match &finnhub {
            Some(client) => {
                quotes = quotes.with_profiles(client.clone());
                client.clone()
            }
            None => yahoo.clone(),
        };
        let news = NewsService::new(news_provider, caches.news.clone(), config.news_max_articles);

        let market = MarketService::new(yahoo.clone(), caches.market.clone());

        let summaries = SummaryGenerator::new(
            llm_from_config(config)?,
            SummarySettings {
                model: config.openai_model.clone(),
                temperature: config.openai_temperature,
                max_tokens: config.openai_max_tokens,
                regen_threshold: config.summary_regen_threshold,
            },
            caches.summaries.clone(),
        );

        let search_providers: Vec<Arc<dyn SearchProvider>> = vec![yahoo, avanza];
        let search = SearchService::new(search_providers, caches.search.clone());

        let mut service = Self::new(quotes, news, market, summaries, search);
        if let Some(mailer) = ResendMailer::from_config(config)? {
            service = service.with_mailer(Arc::new(mailer));
        }

        info!(
            news = if finnhub.is_some() { "finnhub" } else { "yahoo" },
            llm = config.has_llm(),
            "Market service ready"
        );
        Ok(service)
    }

    /// Full payload for a stock page
    ///
    /// The quote is fetched first so unknown tickers fail fast; candles,
    /// news and market context then load concurrently and feed the summary.
    #[instrument(skip(self))]
    pub async fn page(&self, raw_ticker: &str) -> Result<StockPageData> {
        let ticker = normalize_ticker(raw_ticker)?;
        let quote = self.quotes.quote(&ticker).await?;

        let sector = Some(quote.sector.as_str()).filter(|s| !s.is_empty() && *s != "Unknown");
        let (candles, news, market_context) = tokio::join!(
            self.quotes.candles(&ticker),
            self.news.ticker_news(&ticker),
            self.market.context(sector),
        );

        let ai_summary = self.summaries.generate(&quote, &news, &market_context).await;

        Ok(StockPageData {
            quote,
            candles,
            news,
            market_context,
            ai_summary,
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        })
    }

    /// Ticker lookup; never fails
    pub async fn search(&self, query: &str) -> Vec<SearchResult> {
        self.search.search(query).await
    }

    /// Global index board
    pub async fn market_overview(&self) -> MarketContext {
        self.market.overview().await
    }

    /// Validate and relay a contact form message
    pub async fn send_contact(&self, message: &ContactMessage) -> Result<()> {
        message.validate()?;

        let mailer = self
            .mailer
            .as_ref()
            .ok_or_else(|| MarketError::Config("contact relay is not configured".to_string()))?;
        mailer.send(message).await
    }
}

fn llm_from_config(config: &MarketConfig) -> Result<Option<Arc<dyn LLMProvider>>> {
    let Some(key) = &config.openai_api_key else {
        return Ok(None);
    };

    let mut openai = OpenAIConfig::new(key.as_str()).with_timeout(config.request_timeout.as_secs().max(30));
    if let Some(base) = &config.openai_api_base {
        openai = openai.with_api_base(base.as_str());
    }

    Ok(Some(Arc::new(OpenAIProvider::with_config(openai)?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MockIndexProvider, MockNewsProvider, MockQuoteProvider, MockSearchProvider};
    use crate::contact::MockMailer;
    use crate::quotes::tests::sample_snapshot;
    use crate::types::{MarketMood, SummarySource};

    fn build(quote_provider: MockQuoteProvider) -> StockService {
        let caches = CacheManager::default_config();

        let mut news = MockNewsProvider::new();
        news.expect_company_news().returning(|_, _| Ok(Vec::new()));
        news.expect_name().return_const("mock");

        let mut indices = MockIndexProvider::new();
        indices.expect_change_percent().returning(|_| Ok(-0.5));

        let mut search = MockSearchProvider::new();
        search.expect_search().returning(|_| Ok(Vec::new()));
        search.expect_name().return_const("mock");

        StockService::new(
            QuoteService::new(Arc::new(quote_provider), caches.quotes.clone(), caches.candles.clone()),
            NewsService::new(Arc::new(news), caches.news.clone(), 8),
            MarketService::new(Arc::new(indices), caches.market.clone()),
            SummaryGenerator::new(None, SummarySettings::default(), caches.summaries.clone()),
            SearchService::new(vec![Arc::new(search)], caches.search.clone()),
        )
    }

    #[test]
    fn test_normalize_ticker() {
        assert_eq!(normalize_ticker(" aapl ").unwrap(), "AAPL");
        assert_eq!(normalize_ticker("eric-b.st").unwrap(), "ERIC-B.ST");
        assert_eq!(normalize_ticker("^gspc").unwrap(), "^GSPC");
        assert_eq!(normalize_ticker("EURUSD=X").unwrap(), "EURUSD=X");
        assert!(matches!(normalize_ticker(""), Err(MarketError::InvalidSymbol(_))));
        assert!(normalize_ticker("AAPL; DROP").is_err());
        assert!(normalize_ticker("ABCDEFGHIJKLMNOP").is_err());
    }

    #[tokio::test]
    async fn test_page_assembly() {
        let mut provider = MockQuoteProvider::new();
        provider
            .expect_snapshot()
            .withf(|t| t == "AAPL")
            .times(1)
            .returning(|t| Ok(sample_snapshot(t, -1.25)));

        let page = build(provider).page("aapl").await.unwrap();

        assert_eq!(page.quote.ticker, "AAPL");
        assert_eq!(page.candles.len(), 1);
        assert!(page.news.is_empty());
        assert_eq!(page.market_context.market_sentiment, MarketMood::RiskOff);
        assert!(page.market_context.sector_perf.is_none());
        assert_eq!(page.ai_summary.source, SummarySource::Template);
        assert!(page.generated_at.ends_with('Z'));
    }

    #[tokio::test]
    async fn test_pages_without_bars_fetch_once() {
        let mut provider = MockQuoteProvider::new();
        provider.expect_snapshot().times(1).returning(|t| {
            let mut snapshot = sample_snapshot(t, 0.8);
            snapshot.candles.clear();
            Ok(snapshot)
        });

        let service = build(provider);
        assert!(service.page("AAPL").await.unwrap().candles.is_empty());
        assert!(service.page("AAPL").await.unwrap().candles.is_empty());
    }

    #[tokio::test]
    async fn test_page_invalid_symbol_skips_providers() {
        let mut provider = MockQuoteProvider::new();
        provider.expect_snapshot().never();

        let err = build(provider).page("bad ticker!").await.unwrap_err();
        assert!(matches!(err, MarketError::InvalidSymbol(_)));
    }

    #[tokio::test]
    async fn test_page_not_found() {
        let mut provider = MockQuoteProvider::new();
        provider
            .expect_snapshot()
            .returning(|t| Err(MarketError::NotFound(t.to_string())));
        provider.expect_name().return_const("mock");

        assert!(build(provider).page("ZZZZ").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_contact_requires_mailer() {
        let service = build(MockQuoteProvider::new());
        let message = ContactMessage {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            message: "Hello".to_string(),
        };

        assert!(matches!(
            service.send_contact(&message).await,
            Err(MarketError::Config(_))
        ));

        let mut mailer = MockMailer::new();
        mailer.expect_send().times(1).returning(|_| Ok(()));
        let service = service.with_mailer(Arc::new(mailer));
        assert!(service.send_contact(&message).await.is_ok());
    }

    #[tokio::test]
    async fn test_contact_validation_runs_first() {
        let mut mailer = MockMailer::new();
        mailer.expect_send().never();

        let service = build(MockQuoteProvider::new()).with_mailer(Arc::new(mailer));
        let message = ContactMessage {
            name: "Ada".to_string(),
            email: "nope".to_string(),
            message: "Hello".to_string(),
        };
        assert!(matches!(
            service.send_contact(&message).await,
            Err(MarketError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_from_default_config() {
        let service = StockService::from_config(&MarketConfig::default()).unwrap();
        assert!(service.mailer.is_none());
    }
}
