//! Market data providers
//!
//! Tools talk to a [`MarketData`] implementation. Production uses
//! [`LiveMarketData`] (Yahoo Finance, with Alpha Vantage for fundamentals and
//! news when an API key is configured); offline demos and tests use
//! [`SampleMarketData`].

pub mod alpha_vantage;
pub mod sample;
pub mod yahoo;

pub use alpha_vantage::AlphaVantageClient;
pub use sample::SampleMarketData;
pub use yahoo::YahooFinanceClient;

use crate::error::Result;
use crate::types::{CompanyProfile, NewsArticle, Period, PriceBar, Quote};
use analyst_utils::{MarketConfig, MarketProvider};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Source of quotes, history, profiles and news
///
/// Implementations receive tickers already normalized to upper case.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Short provider name for logs
    fn name(&self) -> &'static str;

    /// Whether results are canned sample figures
    fn is_sample(&self) -> bool {
        false
    }

    async fn quote(&self, ticker: &str) -> Result<Quote>;

    /// Daily bars, oldest first
    async fn history(&self, ticker: &str, period: Period) -> Result<Vec<PriceBar>>;

    async fn profile(&self, ticker: &str) -> Result<CompanyProfile>;

    /// Most recent articles first
    async fn news(&self, ticker: &str, limit: usize) -> Result<Vec<NewsArticle>>;
}

/// Yahoo Finance for prices; Alpha Vantage, when keyed, for profiles and news
pub struct LiveMarketData {
    yahoo: YahooFinanceClient,
    alpha_vantage: Option<AlphaVantageClient>,
}

impl LiveMarketData {
    pub fn new(yahoo: YahooFinanceClient, alpha_vantage: Option<AlphaVantageClient>) -> Self {
        Self {
            yahoo,
            alpha_vantage,
        }
    }
}

#[async_trait]
impl MarketData for LiveMarketData {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn quote(&self, ticker: &str) -> Result<Quote> {
        self.yahoo.get_quote(ticker).await
    }

    async fn history(&self, ticker: &str, period: Period) -> Result<Vec<PriceBar>> {
        self.yahoo.get_history(ticker, period).await
    }

    async fn profile(&self, ticker: &str) -> Result<CompanyProfile> {
        let mut profile = match &self.alpha_vantage {
            Some(av) => match av.get_company_overview(ticker).await {
                Ok(profile) => profile,
                Err(e) => {
                    debug!(ticker, error = %e, "Alpha Vantage overview failed, using Yahoo search");
                    self.yahoo.get_profile(ticker).await?
                }
            },
            None => self.yahoo.get_profile(ticker).await?,
        };

        if profile.fifty_two_week_high.is_none() || profile.fifty_two_week_low.is_none() {
            if let Ok(bars) = self.yahoo.get_history(ticker, Period::OneYear).await {
                profile.fifty_two_week_high = bars.iter().map(|b| b.high).reduce(f64::max);
                profile.fifty_two_week_low = bars.iter().map(|b| b.low).reduce(f64::min);
            }
        }
        Ok(profile)
    }

    async fn news(&self, ticker: &str, limit: usize) -> Result<Vec<NewsArticle>> {
        if let Some(av) = &self.alpha_vantage {
            match av.get_news_sentiment(ticker, limit).await {
                Ok(articles) if !articles.is_empty() => return Ok(articles),
                Ok(_) => debug!(ticker, "Alpha Vantage returned no news, using Yahoo search"),
                Err(e) => debug!(ticker, error = %e, "Alpha Vantage news failed, using Yahoo search"),
            }
        }
        self.yahoo.get_news(ticker, limit).await
    }
}

/// Build the provider selected by `config`
pub fn build_provider(config: &MarketConfig) -> Arc<dyn MarketData> {
    match config.provider {
        MarketProvider::Sample => {
            info!("Using sample market data");
            Arc::new(SampleMarketData::new())
        }
        MarketProvider::Yahoo => {
            let alpha_vantage = config
                .alpha_vantage_api_key
                .as_deref()
                .map(|key| AlphaVantageClient::new(key, config.alpha_vantage_rate_limit));
            info!(
                alpha_vantage = alpha_vantage.is_some(),
                "Using Yahoo Finance market data"
            );
            Arc::new(LiveMarketData::new(YahooFinanceClient::new(), alpha_vantage))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_provider() {
        let sample = build_provider(&MarketConfig {
            provider: MarketProvider::Sample,
            ..MarketConfig::default()
        });
        assert!(sample.is_sample());
        assert_eq!(sample.name(), "sample");

        let live = build_provider(&MarketConfig::default());
        assert!(!live.is_sample());
        assert_eq!(live.name(), "yahoo");
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_live_profile() {
        let live = build_provider(&MarketConfig::default());
        let profile = live.profile("AAPL").await.unwrap();
        assert_eq!(profile.ticker, "AAPL");
        assert!(profile.fifty_two_week_high.is_some());
    }
}
