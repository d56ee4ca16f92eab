//! Error types for market data operations

use thiserror::Error;
use whyis_llm::LLMError;

/// Market data specific errors
#[derive(Debug, Error)]
pub enum MarketError {
    /// No quote data exists for the ticker
    #[error("No quote data found for ticker \"{0}\"")]
    NotFound(String),

    /// Ticker failed validation
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// User supplied input was rejected
    #[error("{0}")]
    InvalidInput(String),

    /// Upstream API answered with an error or an unexpected payload
    #[error("{provider} API error: {message}")]
    Api {
        provider: &'static str,
        message: String,
    },

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// LLM completion failed
    #[error("LLM error: {0}")]
    Llm(#[from] LLMError),

    /// Prompt template failed to render
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MarketError {
    pub(crate) fn api(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Api {
            provider,
            message: message.into(),
        }
    }

    /// True when the ticker simply has no data
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type alias for market operations
pub type Result<T> = std::result::Result<T, MarketError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MarketError::NotFound("ZZZZ".to_string());
        assert_eq!(err.to_string(), "No quote data found for ticker \"ZZZZ\"");
        assert!(err.is_not_found());

        let err = MarketError::api("Yahoo", "HTTP 500");
        assert_eq!(err.to_string(), "Yahoo API error: HTTP 500");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_llm_error_conversion() {
        let err: MarketError = LLMError::AuthenticationFailed.into();
        assert!(matches!(err, MarketError::Llm(_)));
    }
}
