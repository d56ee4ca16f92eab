//! Plain-English explanations of a stock's daily move
//!
//! A configured LLM writes the summary; without one, or when the call
//! fails, a fixed template is filled from the same inputs. LLM summaries are
//! cached per ticker and reused until the day's change drifts by the
//! regeneration threshold.

use crate::cache::{CacheKey, CachedSummary, TtlCache};
use crate::error::Result;
use crate::prompts::{SUMMARY_SYSTEM_PROMPT, summary_prompt};
use crate::types::{AiSummary, MarketContext, NewsArticle, StockQuote, SummarySource};
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info};
use whyis_llm::{CompletionRequest, LLMProvider, Message};

const MAX_KEY_REASONS: usize = 5;
const TEMPLATE_KEY_REASONS: usize = 3;
const DISCLAIMER: &str = "Past performance does not guarantee future results.";

/// Model parameters for summary generation
#[derive(Debug, Clone)]
pub struct SummarySettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: usize,
    /// Percentage points of drift that invalidate a cached summary
    pub regen_threshold: f64,
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.4,
            max_tokens: 400,
            regen_threshold: 0.5,
        }
    }
}

#[derive(Clone)]
pub struct SummaryGenerator {
    llm: Option<Arc<dyn LLMProvider>>,
    settings: SummarySettings,
    cache: TtlCache<CachedSummary>,
}

impl SummaryGenerator {
    pub fn new(
        llm: Option<Arc<dyn LLMProvider>>,
        settings: SummarySettings,
        cache: TtlCache<CachedSummary>,
    ) -> Self {
        Self {
            llm,
            settings,
            cache,
        }
    }

    /// Summary for the quote's current move
    pub async fn generate(
        &self,
        quote: &StockQuote,
        news: &[NewsArticle],
        context: &MarketContext,
    ) -> AiSummary {
        let key = CacheKey::new("ai", quote.ticker.as_str());

        if let Some(cached) = self.cache.get(&key).await {
            let drift = (quote.change_percent - cached.change_percent).abs();
            if drift < self.settings.regen_threshold {
                debug!("Reusing summary for {} (drift {drift:.2})", quote.ticker);
                return AiSummary {
                    cached: true,
                    ..cached.summary
                };
            }
            info!("Regenerating summary for {} after {drift:.2}pp drift", quote.ticker);
        }

        let Some(llm) = &self.llm else {
            return template_summary(quote, news);
        };

        match self.llm_summary(llm.as_ref(), quote, news, context).await {
            Ok(summary) => {
                self.cache
                    .insert(
                        key,
                        CachedSummary {
                            summary: summary.clone(),
                            change_percent: quote.change_percent,
                        },
                    )
                    .await;
                summary
            }
            Err(e) => {
                error!(provider = llm.name(), "Summary generation failed for {}: {e}", quote.ticker);
                template_summary(quote, news)
            }
        }
    }

    async fn llm_summary(
        &self,
        llm: &dyn LLMProvider,
        quote: &StockQuote,
        news: &[NewsArticle],
        context: &MarketContext,
    ) -> Result<AiSummary> {
        let prompt = summary_prompt(quote, news, context)?;

        let request = CompletionRequest::builder(self.settings.model.as_str())
            .system(SUMMARY_SYSTEM_PROMPT)
            .add_message(Message::user(prompt))
            .temperature(self.settings.temperature)
            .max_tokens(self.settings.max_tokens)
            .json_response()
            .build();

        let response = llm.complete(request).await?;
        parse_summary(response.text().unwrap_or("{}"), quote)
    }
}

/// Drop a surrounding Markdown code fence, if any
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // skip the info string ("json") on the opening line
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Build a summary from the model's JSON answer, filling gaps with defaults
fn parse_summary(text: &str, quote: &StockQuote) -> Result<AiSummary> {
    let raw: Value = serde_json::from_str(strip_code_fence(text))?;

    let headline = raw
        .get("headline")
        .and_then(Value::as_str)
        .map_or_else(
            || {
                let direction = if quote.is_up() { "Up" } else { "Down" };
                format!("Why Is {} {direction} Today?", quote.name)
            },
            str::to_string,
        );

    let summary = raw
        .get("summary")
        .and_then(Value::as_str)
        .unwrap_or("Summary unavailable.")
        .to_string();

    let key_reasons = raw
        .get("keyReasons")
        .and_then(Value::as_array)
        .map(|reasons| {
            reasons
                .iter()
                .filter_map(Value::as_str)
                .take(MAX_KEY_REASONS)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(AiSummary {
        headline,
        summary,
        key_reasons,
        generated_at: now_iso(),
        cached: false,
        source: SummarySource::Llm,
    })
}

/// Summary composed without a model
pub fn template_summary(quote: &StockQuote, news: &[NewsArticle]) -> AiSummary {
    let abs_pct = format!("{:.2}", quote.change_percent.abs());

    let news_sentence = news.first().map_or_else(
        || "No specific news catalyst has been identified. ".to_string(),
        |article| format!("Recent news includes: \"{}\". ", article.headline),
    );

    let summary = format!(
        "{name} ({ticker}) is trading at ${price:.2}, {direction} {abs_pct}% from yesterday's \
         close of ${prev:.2}. {news_sentence}Market conditions and broader macro factors may be \
         contributing to the move. {DISCLAIMER}",
        name = quote.name,
        ticker = quote.ticker,
        price = quote.price,
        direction = quote.direction(),
        prev = quote.previous_close,
    );

    AiSummary {
        headline: format!("{} moves {abs_pct}% today", quote.name),
        summary,
        key_reasons: news
            .iter()
            .take(TEMPLATE_KEY_REASONS)
            .map(|n| n.headline.clone())
            .collect(),
        generated_at: now_iso(),
        cached: false,
        source: SummarySource::Template,
    }
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quotes::tests::sample_quote;
    use crate::types::{MarketMood, Sentiment};
    use async_trait::async_trait;
    use mockall::mock;
    use std::time::Duration;
    use whyis_llm::{CompletionResponse, LLMError, ResponseFormat, StopReason, TokenUsage};

    mock! {
        Llm {}

        #[async_trait]
        impl LLMProvider for Llm {
            async fn complete(&self, request: CompletionRequest) -> whyis_llm::Result<CompletionResponse>;
            fn name(&self) -> &'static str;
        }
    }

    fn reply(text: &str) -> CompletionResponse {
        CompletionResponse {
            message: Message::assistant(text),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        }
    }

    fn context() -> MarketContext {
        MarketContext {
            indices: Vec::new(),
            sector_perf: None,
            market_sentiment: MarketMood::Neutral,
        }
    }

    fn article(headline: &str) -> NewsArticle {
        NewsArticle {
            id: headline.to_string(),
            headline: headline.to_string(),
            summary: String::new(),
            url: String::new(),
            source: String::new(),
            published_at: String::new(),
            sentiment: Sentiment::Neutral,
            sentiment_score: 0.0,
            image: None,
        }
    }

    fn generator(llm: Option<MockLlm>) -> SummaryGenerator {
        SummaryGenerator::new(
            llm.map(|l| Arc::new(l) as Arc<dyn LLMProvider>),
            SummarySettings::default(),
            TtlCache::new(Duration::from_secs(900)),
        )
    }

    const GOOD_REPLY: &str = r#"{"headline":"Apple slips on supply worries","summary":"Shares fell. Past performance does not guarantee future results.","keyReasons":["a","b","c","d","e","f"]}"#;

    #[test]
    fn test_template_summary() {
        let quote = sample_quote("AAPL", -2.5);
        let summary = template_summary(&quote, &[article("iPhone demand cools"), article("b")]);

        assert_eq!(summary.headline, "AAPL Corp moves 2.50% today");
        assert_eq!(
            summary.summary,
            "AAPL Corp (AAPL) is trading at $97.50, down 2.50% from yesterday's close of $100.00. \
             Recent news includes: \"iPhone demand cools\". Market conditions and broader macro \
             factors may be contributing to the move. Past performance does not guarantee future results."
        );
        assert_eq!(summary.key_reasons, vec!["iPhone demand cools", "b"]);
        assert_eq!(summary.source, SummarySource::Template);
    }

    #[test]
    fn test_template_summary_without_news() {
        let summary = template_summary(&sample_quote("AAPL", 1.0), &[]);
        assert!(summary.summary.contains("No specific news catalyst has been identified."));
        assert!(summary.key_reasons.is_empty());
    }

    #[test]
    fn test_parse_summary_defaults() {
        let quote = sample_quote("TSLA", 4.0);
        let summary = parse_summary("{}", &quote).unwrap();
        assert_eq!(summary.headline, "Why Is TSLA Corp Up Today?");
        assert_eq!(summary.summary, "Summary unavailable.");
        assert!(summary.key_reasons.is_empty());

        let down = sample_quote("TSLA", -4.0);
        assert_eq!(
            parse_summary("{}", &down).unwrap().headline,
            "Why Is TSLA Corp Down Today?"
        );
    }

    #[test]
    fn test_parse_summary_caps_reasons_and_strips_fences() {
        let quote = sample_quote("AAPL", -1.0);
        let fenced = format!("```json\n{GOOD_REPLY}\n```");

        let summary = parse_summary(&fenced, &quote).unwrap();
        assert_eq!(summary.headline, "Apple slips on supply worries");
        assert_eq!(summary.key_reasons.len(), 5);
        assert_eq!(summary.source, SummarySource::Llm);
    }

    #[test]
    fn test_parse_summary_rejects_garbage() {
        assert!(parse_summary("not json", &sample_quote("AAPL", 0.0)).is_err());
    }

    #[tokio::test]
    async fn test_no_llm_uses_template() {
        let summary = generator(None)
            .generate(&sample_quote("AAPL", 1.0), &[], &context())
            .await;
        assert_eq!(summary.source, SummarySource::Template);
        assert!(!summary.cached);
    }

    #[tokio::test]
    async fn test_llm_request_and_cache_reuse() {
        let mut llm = MockLlm::new();
        llm.expect_complete()
            .withf(|r| {
                r.model == "gpt-4o-mini"
                    && r.max_tokens == 400
                    && r.response_format == ResponseFormat::JsonObject
                    && r.messages.len() == 1
                    && r.system.as_deref() == Some(SUMMARY_SYSTEM_PROMPT)
            })
            .times(1)
            .returning(|_| Ok(reply(GOOD_REPLY)));
        llm.expect_name().return_const("mock");

        let generator = generator(Some(llm));
        let first = generator.generate(&sample_quote("AAPL", -1.0), &[], &context()).await;
        assert!(!first.cached);

        // drift of 0.3pp stays under the 0.5 threshold
        let second = generator.generate(&sample_quote("AAPL", -1.3), &[], &context()).await;
        assert!(second.cached);
        assert_eq!(second.headline, first.headline);
    }

    #[tokio::test]
    async fn test_drift_forces_regeneration() {
        let mut llm = MockLlm::new();
        llm.expect_complete()
            .times(2)
            .returning(|_| Ok(reply(GOOD_REPLY)));
        llm.expect_name().return_const("mock");

        let generator = generator(Some(llm));
        generator.generate(&sample_quote("AAPL", -1.0), &[], &context()).await;
        let again = generator.generate(&sample_quote("AAPL", -2.0), &[], &context()).await;
        assert!(!again.cached);
    }

    #[tokio::test]
    async fn test_drift_at_threshold_regenerates() {
        let mut llm = MockLlm::new();
        llm.expect_complete()
            .times(2)
            .returning(|_| Ok(reply(GOOD_REPLY)));
        llm.expect_name().return_const("mock");

        let generator = generator(Some(llm));
        generator.generate(&sample_quote("AAPL", 2.0), &[], &context()).await;

        // exactly 0.5pp: only strictly smaller drift reuses the cache
        let again = generator.generate(&sample_quote("AAPL", 2.5), &[], &context()).await;
        assert!(!again.cached);
        assert_eq!(again.source, SummarySource::Llm);
    }

    #[tokio::test]
    async fn test_llm_failure_falls_back_without_caching() {
        let mut llm = MockLlm::new();
        llm.expect_complete()
            .times(2)
            .returning(|_| Err(LLMError::RateLimitExceeded("slow down".to_string())));
        llm.expect_name().return_const("mock");

        let generator = generator(Some(llm));
        let quote = sample_quote("AAPL", 2.0);

        let first = generator.generate(&quote, &[article("x")], &context()).await;
        assert_eq!(first.source, SummarySource::Template);
        assert_eq!(first.key_reasons, vec!["x"]);

        let second = generator.generate(&quote, &[], &context()).await;
        assert!(!second.cached);
    }
}
