//! Configuration for market data operations

use crate::error::{MarketError, Result};
use std::time::Duration;
use url::Url;

const DEFAULT_YAHOO_BASE: &str = "https://query2.finance.yahoo.com";
const DEFAULT_AVANZA_BASE: &str = "https://www.avanza.se";
const DEFAULT_FINNHUB_BASE: &str = "https://finnhub.io/api/v1";
const DEFAULT_RESEND_BASE: &str = "https://api.resend.com";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; WhyIs/1.0)";

/// Configuration for market data operations
#[derive(Debug, Clone)]
pub struct MarketConfig {
    /// Cache TTL for quotes
    pub cache_ttl_quote: Duration,

    /// Cache TTL for intraday candles
    pub cache_ttl_candles: Duration,

    /// Cache TTL for news
    pub cache_ttl_news: Duration,

    /// Cache TTL for generated summaries
    pub cache_ttl_summary: Duration,

    /// Cache TTL for market context and overview
    pub cache_ttl_market: Duration,

    /// Cache TTL for search results
    pub cache_ttl_search: Duration,

    /// Request timeout duration
    pub request_timeout: Duration,

    /// User agent sent to the unofficial APIs
    pub user_agent: String,

    /// Yahoo Finance API root
    pub yahoo_base_url: Url,

    /// Avanza API root
    pub avanza_base_url: Url,

    /// Use Avanza when Yahoo has no data for a `.ST` ticker
    pub avanza_fallback: bool,

    /// Finnhub API root
    pub finnhub_base_url: Url,

    /// Finnhub API key (optional, enables company news and profiles)
    pub finnhub_api_key: Option<String>,

    /// Finnhub requests per minute
    pub finnhub_rate_limit: u32,

    /// OpenAI API key (optional, enables LLM summaries)
    pub openai_api_key: Option<String>,

    /// OpenAI-compatible API base override
    pub openai_api_base: Option<String>,

    /// Model used for summaries
    pub openai_model: String,

    /// Sampling temperature for summaries
    pub openai_temperature: f32,

    /// Token cap for summaries
    pub openai_max_tokens: usize,

    /// Change in percentage points that forces a new summary
    pub summary_regen_threshold: f64,

    /// Days of company news to look back over
    pub news_lookback_days: i64,

    /// Maximum articles returned per ticker
    pub news_max_articles: usize,

    /// Resend API root
    pub resend_base_url: Url,

    /// Resend API key (optional, enables the contact relay)
    pub resend_api_key: Option<String>,

    /// Recipient of contact form messages
    pub contact_email: Option<String>,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            cache_ttl_quote: Duration::from_secs(60),
            cache_ttl_candles: Duration::from_secs(300),
            cache_ttl_news: Duration::from_secs(600),
            cache_ttl_summary: Duration::from_secs(900),
            cache_ttl_market: Duration::from_secs(120),
            cache_ttl_search: Duration::from_secs(60),
            request_timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            yahoo_base_url: default_url(DEFAULT_YAHOO_BASE),
            avanza_base_url: default_url(DEFAULT_AVANZA_BASE),
            avanza_fallback: true,
            finnhub_base_url: default_url(DEFAULT_FINNHUB_BASE),
            finnhub_api_key: None,
            finnhub_rate_limit: 60,
            openai_api_key: None,
            openai_api_base: None,
            openai_model: "gpt-4o-mini".to_string(),
            openai_temperature: 0.4,
            openai_max_tokens: 400,
            summary_regen_threshold: 0.5,
            news_lookback_days: 7,
            news_max_articles: 8,
            resend_base_url: default_url(DEFAULT_RESEND_BASE),
            resend_api_key: None,
            contact_email: None,
        }
    }
}

// Only called with the constants above.
fn default_url(raw: &str) -> Url {
    Url::parse(raw).expect("default URLs are valid")
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl MarketConfig {
    /// Create a new configuration builder
    pub fn builder() -> MarketConfigBuilder {
        MarketConfigBuilder::default()
    }

    /// Build a configuration from environment variables
    ///
    /// Reads `FINNHUB_API_KEY`, `OPENAI_API_KEY`, `OPENAI_API_BASE`,
    /// `OPENAI_MODEL`, `RESEND_API_KEY` and `CONTACT_EMAIL`.
    pub fn from_env() -> Result<Self> {
        Self::builder().with_env().build()
    }

    /// Whether an LLM is configured for summaries
    pub fn has_llm(&self) -> bool {
        self.openai_api_key.is_some()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.finnhub_rate_limit == 0 {
            return Err(MarketError::Config(
                "finnhub_rate_limit must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.openai_temperature) {
            return Err(MarketError::Config(format!(
                "openai_temperature must be within 0.0..=2.0, got {}",
                self.openai_temperature
            )));
        }

        if self.summary_regen_threshold < 0.0 {
            return Err(MarketError::Config(
                "summary_regen_threshold must not be negative".to_string(),
            ));
        }

        if self.news_max_articles == 0 || self.news_lookback_days <= 0 {
            return Err(MarketError::Config(
                "news window and article limit must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(MarketError::Config(
                "request_timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for MarketConfig
#[derive(Debug, Default)]
pub struct MarketConfigBuilder {
    cache_ttl_quote: Option<Duration>,
    cache_ttl_candles: Option<Duration>,
    cache_ttl_news: Option<Duration>,
    cache_ttl_summary: Option<Duration>,
    cache_ttl_market: Option<Duration>,
    cache_ttl_search: Option<Duration>,
    request_timeout: Option<Duration>,
    user_agent: Option<String>,
    yahoo_base_url: Option<Url>,
    avanza_base_url: Option<Url>,
    avanza_fallback: Option<bool>,
    finnhub_base_url: Option<Url>,
    finnhub_api_key: Option<String>,
    finnhub_rate_limit: Option<u32>,
    openai_api_key: Option<String>,
    openai_api_base: Option<String>,
    openai_model: Option<String>,
    openai_temperature: Option<f32>,
    openai_max_tokens: Option<usize>,
    summary_regen_threshold: Option<f64>,
    news_lookback_days: Option<i64>,
    news_max_articles: Option<usize>,
    resend_base_url: Option<Url>,
    resend_api_key: Option<String>,
    contact_email: Option<String>,
}

impl MarketConfigBuilder {
    /// Set cache TTL for quotes
    pub fn cache_ttl_quote(mut self, duration: Duration) -> Self {
        self.cache_ttl_quote = Some(duration);
        self
    }

    /// Set cache TTL for candles
    pub fn cache_ttl_candles(mut self, duration: Duration) -> Self {
        self.cache_ttl_candles = Some(duration);
        self
    }

    /// Set cache TTL for news
    pub fn cache_ttl_news(mut self, duration: Duration) -> Self {
        self.cache_ttl_news = Some(duration);
        self
    }

    /// Set cache TTL for summaries
    pub fn cache_ttl_summary(mut self, duration: Duration) -> Self {
        self.cache_ttl_summary = Some(duration);
        self
    }

    /// Set cache TTL for market context
    pub fn cache_ttl_market(mut self, duration: Duration) -> Self {
        self.cache_ttl_market = Some(duration);
        self
    }

    /// Set cache TTL for search results
    pub fn cache_ttl_search(mut self, duration: Duration) -> Self {
        self.cache_ttl_search = Some(duration);
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Override the Yahoo Finance API root
    pub fn yahoo_base_url(mut self, url: Url) -> Self {
        self.yahoo_base_url = Some(url);
        self
    }

    /// Override the Avanza API root
    pub fn avanza_base_url(mut self, url: Url) -> Self {
        self.avanza_base_url = Some(url);
        self
    }

    /// Enable or disable the Avanza fallback
    pub fn avanza_fallback(mut self, enabled: bool) -> Self {
        self.avanza_fallback = Some(enabled);
        self
    }

    /// Override the Finnhub API root
    pub fn finnhub_base_url(mut self, url: Url) -> Self {
        self.finnhub_base_url = Some(url);
        self
    }

    /// Set Finnhub API key
    pub fn finnhub_api_key(mut self, key: impl Into<String>) -> Self {
        self.finnhub_api_key = Some(key.into());
        self
    }

    /// Set Finnhub requests per minute
    pub fn finnhub_rate_limit(mut self, per_minute: u32) -> Self {
        self.finnhub_rate_limit = Some(per_minute);
        self
    }

    /// Set OpenAI API key
    pub fn openai_api_key(mut self, key: impl Into<String>) -> Self {
        self.openai_api_key = Some(key.into());
        self
    }

    /// Set an OpenAI-compatible API base
    pub fn openai_api_base(mut self, base: impl Into<String>) -> Self {
        self.openai_api_base = Some(base.into());
        self
    }

    /// Set the summary model
    pub fn openai_model(mut self, model: impl Into<String>) -> Self {
        self.openai_model = Some(model.into());
        self
    }

    /// Set the summary temperature
    pub fn openai_temperature(mut self, temperature: f32) -> Self {
        self.openai_temperature = Some(temperature);
        self
    }

    /// Set the summary token cap
    pub fn openai_max_tokens(mut self, max_tokens: usize) -> Self {
        self.openai_max_tokens = Some(max_tokens);
        self
    }

    /// Set the summary regeneration threshold (percentage points)
    pub fn summary_regen_threshold(mut self, threshold: f64) -> Self {
        self.summary_regen_threshold = Some(threshold);
        self
    }

    /// Set how many days of news to fetch
    pub fn news_lookback_days(mut self, days: i64) -> Self {
        self.news_lookback_days = Some(days);
        self
    }

    /// Set the per-ticker article limit
    pub fn news_max_articles(mut self, max: usize) -> Self {
        self.news_max_articles = Some(max);
        self
    }

    /// Override the Resend API root
    pub fn resend_base_url(mut self, url: Url) -> Self {
        self.resend_base_url = Some(url);
        self
    }

    /// Set Resend API key
    pub fn resend_api_key(mut self, key: impl Into<String>) -> Self {
        self.resend_api_key = Some(key.into());
        self
    }

    /// Set the contact form recipient
    pub fn contact_email(mut self, email: impl Into<String>) -> Self {
        self.contact_email = Some(email.into());
        self
    }

    /// Load keys and overrides from the environment
    ///
    /// Values already set on the builder win over the environment.
    pub fn with_env(mut self) -> Self {
        self.finnhub_api_key = self.finnhub_api_key.or_else(|| env_value("FINNHUB_API_KEY"));
        self.openai_api_key = self.openai_api_key.or_else(|| env_value("OPENAI_API_KEY"));
        self.openai_api_base = self.openai_api_base.or_else(|| env_value("OPENAI_API_BASE"));
        self.openai_model = self.openai_model.or_else(|| env_value("OPENAI_MODEL"));
        self.resend_api_key = self.resend_api_key.or_else(|| env_value("RESEND_API_KEY"));
        self.contact_email = self.contact_email.or_else(|| env_value("CONTACT_EMAIL"));
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<MarketConfig> {
        let defaults = MarketConfig::default();

        let config = MarketConfig {
            cache_ttl_quote: self.cache_ttl_quote.unwrap_or(defaults.cache_ttl_quote),
            cache_ttl_candles: self.cache_ttl_candles.unwrap_or(defaults.cache_ttl_candles),
            cache_ttl_news: self.cache_ttl_news.unwrap_or(defaults.cache_ttl_news),
            cache_ttl_summary: self.cache_ttl_summary.unwrap_or(defaults.cache_ttl_summary),
            cache_ttl_market: self.cache_ttl_market.unwrap_or(defaults.cache_ttl_market),
            cache_ttl_search: self.cache_ttl_search.unwrap_or(defaults.cache_ttl_search),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            user_agent: self.user_agent.unwrap_or(defaults.user_agent),
            yahoo_base_url: self.yahoo_base_url.unwrap_or(defaults.yahoo_base_url),
            avanza_base_url: self.avanza_base_url.unwrap_or(defaults.avanza_base_url),
            avanza_fallback: self.avanza_fallback.unwrap_or(defaults.avanza_fallback),
            finnhub_base_url: self.finnhub_base_url.unwrap_or(defaults.finnhub_base_url),
            finnhub_api_key: self.finnhub_api_key,
            finnhub_rate_limit: self.finnhub_rate_limit.unwrap_or(defaults.finnhub_rate_limit),
            openai_api_key: self.openai_api_key,
            openai_api_base: self.openai_api_base,
            openai_model: self.openai_model.unwrap_or(defaults.openai_model),
            openai_temperature: self.openai_temperature.unwrap_or(defaults.openai_temperature),
            openai_max_tokens: self.openai_max_tokens.unwrap_or(defaults.openai_max_tokens),
            summary_regen_threshold: self
                .summary_regen_threshold
                .unwrap_or(defaults.summary_regen_threshold),
            news_lookback_days: self.news_lookback_days.unwrap_or(defaults.news_lookback_days),
            news_max_articles: self.news_max_articles.unwrap_or(defaults.news_max_articles),
            resend_base_url: self.resend_base_url.unwrap_or(defaults.resend_base_url),
            resend_api_key: self.resend_api_key,
            contact_email: self.contact_email,
        };

        config.validate()?;
        Ok(config)
    }
}
