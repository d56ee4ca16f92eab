//! Keyword-based headline sentiment
//!
//! Each keyword found anywhere in the lowercased text (substring match, so
//! `"up"` also hits `"update"`) adds or subtracts one point. The raw score is
//! divided by the size of the longer keyword list and clamped to `-1..=1`.

use crate::types::Sentiment;

const POSITIVE: &[&str] = &[
    "beat", "beats", "surge", "surges", "rally", "rallies", "gain", "gains", "rise", "rises",
    "up", "upgrade", "upgrades", "buy", "outperform", "record", "profit", "revenue growth",
    "strong", "positive", "optimistic", "bullish", "recovery", "recover", "higher", "boost",
    "boosted",
];

const NEGATIVE: &[&str] = &[
    "miss", "misses", "fall", "falls", "drop", "drops", "decline", "declines", "down",
    "downgrade", "downgrades", "sell", "underperform", "weak", "loss", "losses", "concern",
    "risk", "warning", "cut", "cuts", "lowered", "disappointing", "below", "bearish", "crash",
    "fear", "fears", "lawsuit", "investigation", "recall", "debt", "layoff", "layoffs",
];

/// Label boundary on the normalized score
const NEUTRAL_BAND: f64 = 0.05;

/// Sentiment label with its normalized score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentimentScore {
    pub sentiment: Sentiment,
    pub score: f64,
}

/// Score a piece of text
pub fn score_sentiment(text: &str) -> SentimentScore {
    let lower = text.to_lowercase();

    let hits = |words: &[&str]| words.iter().filter(|w| lower.contains(*w)).count() as i64;
    let raw = hits(POSITIVE) - hits(NEGATIVE);

    let max_possible = POSITIVE.len().max(NEGATIVE.len()) as f64;
    let score = (raw as f64 / max_possible).clamp(-1.0, 1.0);

    let sentiment = if score > NEUTRAL_BAND {
        Sentiment::Positive
    } else if score < -NEUTRAL_BAND {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    };

    SentimentScore { sentiment, score }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_list_sizes() {
        assert_eq!(POSITIVE.len(), 27);
        assert_eq!(NEGATIVE.len(), 34);
    }

    #[test]
    fn test_empty_text_is_neutral() {
        let result = score_sentiment("");
        assert_eq!(result.sentiment, Sentiment::Neutral);
        assert!(result.score.abs() < f64::EPSILON);
    }

    #[test]
    fn test_single_hit_stays_neutral() {
        // 1/34 is inside the neutral band
        let result = score_sentiment("Company announces profit");
        assert_eq!(result.sentiment, Sentiment::Neutral);
        assert!((result.score - 1.0 / 34.0).abs() < 1e-9);
    }

    #[test]
    fn test_two_hits_are_positive() {
        let result = score_sentiment("Shares SURGE to a record");
        assert_eq!(result.sentiment, Sentiment::Positive);
        assert!((result.score - 2.0 / 34.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_headline() {
        let result = score_sentiment("Stock falls after earnings miss and analyst downgrade");
        // fall, falls, miss, down, downgrade
        assert_eq!(result.sentiment, Sentiment::Negative);
        assert!((result.score + 5.0 / 34.0).abs() < 1e-9);
    }

    #[test]
    fn test_substring_matching() {
        // "update" contains "up", "breakdown" contains "down"
        let result = score_sentiment("update on breakdown");
        assert!(result.score.abs() < f64::EPSILON);
    }

    #[test]
    fn test_multi_word_keyword() {
        let with = score_sentiment("strong revenue growth");
        let without = score_sentiment("strong revenue");
        assert!(with.score > without.score);
    }

    #[test]
    fn test_score_is_clamped() {
        let text = NEGATIVE.join(" ");
        let result = score_sentiment(&text);
        assert!(result.score >= -1.0);
        assert_eq!(result.sentiment, Sentiment::Negative);
    }
}
