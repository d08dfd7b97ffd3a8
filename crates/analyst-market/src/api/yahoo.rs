//! Yahoo Finance API client
//!
//! Quotes and history go through `yahoo_finance_api`; company lookup and
//! headlines use Yahoo's public search endpoint directly.

use crate::error::{MarketError, Result};
use crate::types::{CompanyProfile, NewsArticle, Period, PriceBar, Quote};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use time::OffsetDateTime;
use yahoo_finance_api as yahoo;

const PROVIDER: &str = "Yahoo Finance";
const SEARCH_URL: &str = "https://query2.finance.yahoo.com/v1/finance/search";
const USER_AGENT: &str = concat!("financial-analyst/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Default)]
pub struct YahooFinanceClient {
    http: reqwest::Client,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    quotes: Vec<SearchQuote>,
    #[serde(default)]
    news: Vec<SearchNews>,
}

#[derive(Debug, Deserialize)]
struct SearchQuote {
    symbol: String,
    #[serde(default)]
    shortname: Option<String>,
    #[serde(default)]
    longname: Option<String>,
    #[serde(default)]
    sector: Option<String>,
    #[serde(default)]
    industry: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchNews {
    title: String,
    #[serde(default)]
    publisher: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    provider_publish_time: Option<i64>,
}

/// Map connector errors, recognizing the "no such ticker" family
fn yahoo_error(ticker: &str, err: &yahoo::YahooError) -> MarketError {
    let message = err.to_string();
    let lower = message.to_lowercase();
    if lower.contains("not found") || lower.contains("no data") || lower.contains("no quotes") {
        MarketError::NotFound(ticker.to_string())
    } else {
        MarketError::provider(PROVIDER, message)
    }
}

fn to_bar(q: &yahoo::Quote) -> Option<PriceBar> {
    let date = DateTime::from_timestamp(q.timestamp as i64, 0)?.date_naive();
    Some(PriceBar {
        date,
        open: q.open,
        high: q.high,
        low: q.low,
        close: q.close,
        volume: q.volume,
    })
}

impl YahooFinanceClient {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self { http }
    }

    fn connector() -> Result<yahoo::YahooConnector> {
        yahoo::YahooConnector::new().map_err(|e| MarketError::provider(PROVIDER, e.to_string()))
    }

    pub async fn get_quote(&self, ticker: &str) -> Result<Quote> {
        let response = Self::connector()?
            .get_latest_quotes(ticker, "1d")
            .await
            .map_err(|e| yahoo_error(ticker, &e))?;
        let quote = response.last_quote().map_err(|e| yahoo_error(ticker, &e))?;

        Ok(Quote {
            ticker: ticker.to_string(),
            price: quote.close,
            open: quote.open,
            day_high: quote.high,
            day_low: quote.low,
            volume: quote.volume,
            timestamp: DateTime::from_timestamp(quote.timestamp as i64, 0).unwrap_or_else(Utc::now),
        })
    }

    pub async fn get_history(&self, ticker: &str, period: Period) -> Result<Vec<PriceBar>> {
        let end = Utc::now();
        let start = period.start(end);
        let to_odt = |dt: DateTime<Utc>| {
            OffsetDateTime::from_unix_timestamp(dt.timestamp())
                .map_err(|e| MarketError::provider(PROVIDER, format!("invalid timestamp: {e}")))
        };

        let response = Self::connector()?
            .get_quote_history(ticker, to_odt(start)?, to_odt(end)?)
            .await
            .map_err(|e| yahoo_error(ticker, &e))?;
        let quotes = response.quotes().map_err(|e| yahoo_error(ticker, &e))?;

        let bars: Vec<PriceBar> = quotes.iter().filter_map(to_bar).collect();
        if bars.is_empty() {
            return Err(MarketError::NotFound(ticker.to_string()));
        }
        Ok(bars)
    }

    async fn search(&self, ticker: &str, news_count: usize) -> Result<SearchResponse> {
        let response = self
            .http
            .get(SEARCH_URL)
            .query(&[
                ("q", ticker),
                ("quotesCount", "1"),
                ("newsCount", &news_count.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MarketError::provider(
                PROVIDER,
                format!("search returned HTTP {}", response.status()),
            ));
        }
        Ok(response.json().await?)
    }

    /// Name, sector and industry from the search endpoint
    pub async fn get_profile(&self, ticker: &str) -> Result<CompanyProfile> {
        let found = self
            .search(ticker, 0)
            .await?
            .quotes
            .into_iter()
            .find(|q| q.symbol.eq_ignore_ascii_case(ticker))
            .ok_or_else(|| MarketError::NotFound(ticker.to_string()))?;

        Ok(CompanyProfile {
            ticker: ticker.to_string(),
            name: found.longname.or(found.shortname),
            sector: found.sector,
            industry: found.industry,
            ..CompanyProfile::default()
        })
    }

    pub async fn get_news(&self, ticker: &str, limit: usize) -> Result<Vec<NewsArticle>> {
        let news = self.search(ticker, limit).await?.news;
        Ok(news
            .into_iter()
            .take(limit)
            .map(|n| NewsArticle {
                headline: n.title,
                date: n
                    .provider_publish_time
                    .and_then(|t| DateTime::from_timestamp(t, 0)),
                summary: None,
                sentiment: None,
                source: n.publisher,
                url: n.link,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_response_parsing() {
        let body = serde_json::json!({
            "quotes": [{"symbol": "AAPL", "shortname": "Apple Inc.", "longname": "Apple Inc.",
                        "sector": "Technology", "industry": "Consumer Electronics"}],
            "news": [{"title": "Apple unveils new chips", "publisher": "Reuters",
                      "link": "https://example.com/a", "providerPublishTime": 1_735_689_600}]
        });
        let parsed: SearchResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.quotes[0].sector.as_deref(), Some("Technology"));
        assert_eq!(parsed.news[0].provider_publish_time, Some(1_735_689_600));
    }

    #[test]
    fn test_search_response_tolerates_missing_sections() {
        let parsed: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.quotes.is_empty());
        assert!(parsed.news.is_empty());
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_get_quote() {
        let client = YahooFinanceClient::new();
        let quote = client.get_quote("AAPL").await.unwrap();
        assert_eq!(quote.ticker, "AAPL");
        assert!(quote.price > 0.0);
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_get_history() {
        let client = YahooFinanceClient::new();
        let bars = client.get_history("MSFT", Period::OneMonth).await.unwrap();
        assert!(bars.len() > 10);
        assert!(bars.windows(2).all(|w| w[0].date <= w[1].date));
    }
}
