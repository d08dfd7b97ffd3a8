//! Error types for market data and artifact operations

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarketError {
    /// No data exists for the ticker
    #[error("No data found for ticker '{0}'")]
    NotFound(String),

    #[error("Invalid ticker: '{0}'")]
    InvalidTicker(String),

    #[error("Invalid period '{0}' (expected one of 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max)")]
    InvalidPeriod(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Rate limit exceeded for {provider}")]
    RateLimited { provider: String },

    /// Upstream API returned an error payload
    #[error("{provider} error: {message}")]
    Provider { provider: String, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Chart rendering failed: {0}")]
    Chart(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MarketError {
    pub(crate) fn provider(provider: &str, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MarketError>;

/// Outside a tool call, market errors are setup or processing failures.
/// Tools report theirs with [`analyst_core::Error::tool`] instead.
impl From<MarketError> for analyst_core::Error {
    fn from(err: MarketError) -> Self {
        match err {
            MarketError::Config(msg) => Self::Configuration(msg),
            other => Self::ProcessingFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            MarketError::NotFound("ZZZZ".into()).to_string(),
            "No data found for ticker 'ZZZZ'"
        );
        assert_eq!(
            MarketError::provider("Alpha Vantage", "Invalid API call").to_string(),
            "Alpha Vantage error: Invalid API call"
        );
    }

    #[test]
    fn test_conversion_to_core_error() {
        let err: analyst_core::Error = MarketError::Config("missing key".into()).into();
        assert!(matches!(err, analyst_core::Error::Configuration(_)));

        let err: analyst_core::Error = MarketError::Chart("empty series".into()).into();
        assert!(matches!(err, analyst_core::Error::ProcessingFailed(_)));
    }
}
