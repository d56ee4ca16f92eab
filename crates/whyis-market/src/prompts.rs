//! Prompt template for move summaries

use crate::error::Result;
use crate::types::{MarketContext, NewsArticle, StockQuote};
use minijinja::Environment;
use serde::Serialize;

/// Headlines shown to the model
const PROMPT_HEADLINES: usize = 5;

/// System prompt sent with every summary request
pub const SUMMARY_SYSTEM_PROMPT: &str = "You are a concise financial analyst writing for retail investors.";

const SUMMARY_PROMPT: &str = r#"Stock: {{ name }} ({{ ticker }})
Price: ${{ price }} ({{ direction }} {{ abs_pct }}% today)
Market sentiment: {{ market_sentiment }}
Indices: {% for index in indices %}{{ index.name }}: {{ index.change }}%{% if not loop.last %}, {% endif %}{% endfor %}
{% if sector %}Sector ({{ sector.name }}): {{ sector.change }}%{% else %}Sector data unavailable{% endif %}

Recent news headlines:
{% for item in headlines -%}
{{ loop.index }}. [{{ item.sentiment }}] {{ item.headline }}
{% else -%}
No recent news available.
{% endfor %}
Write a response with EXACTLY this JSON structure:
{
  "headline": "<10-word punchy headline explaining today's move>",
  "summary": "<100-150 word plain-English explanation of why the stock is {{ direction }} today. Cover: price move magnitude, relevant news, market context, and sector. Do NOT give investment advice.>",
  "keyReasons": ["<reason 1>", "<reason 2>", "<reason 3>"]
}

Rules:
- Be factual and neutral
- Use simple language
- If no clear reason, say "no single catalyst identified"
- Never recommend buying or selling
- End summary with: "Past performance does not guarantee future results.""#;

#[derive(Serialize)]
struct PromptVars<'a> {
    name: &'a str,
    ticker: &'a str,
    price: String,
    direction: &'static str,
    abs_pct: String,
    market_sentiment: &'static str,
    indices: Vec<IndexLine<'a>>,
    sector: Option<IndexLine<'a>>,
    headlines: Vec<HeadlineLine<'a>>,
}

#[derive(Serialize)]
struct IndexLine<'a> {
    name: &'a str,
    change: String,
}

#[derive(Serialize)]
struct HeadlineLine<'a> {
    sentiment: &'static str,
    headline: &'a str,
}

/// Render the summary prompt for a quote, its news and the market backdrop
pub fn summary_prompt(
    quote: &StockQuote,
    news: &[NewsArticle],
    context: &MarketContext,
) -> Result<String> {
    let vars = PromptVars {
        name: &quote.name,
        ticker: &quote.ticker,
        price: format!("{:.2}", quote.price),
        direction: quote.direction(),
        abs_pct: format!("{:.2}", quote.change_percent.abs()),
        market_sentiment: context.market_sentiment.as_str(),
        indices: context
            .indices
            .iter()
            .map(|i| IndexLine {
                name: &i.name,
                change: format!("{:+.2}", i.change_percent),
            })
            .collect(),
        sector: context.sector_perf.as_ref().map(|s| IndexLine {
            name: &s.sector,
            change: format!("{:.2}", s.change_percent),
        }),
        headlines: news
            .iter()
            .take(PROMPT_HEADLINES)
            .map(|n| HeadlineLine {
                sentiment: n.sentiment.as_str(),
                headline: &n.headline,
            })
            .collect(),
    };

    Ok(Environment::new().render_str(SUMMARY_PROMPT, vars)?)
}
