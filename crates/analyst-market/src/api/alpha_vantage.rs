//! Alpha Vantage API client
//!
//! Used for company fundamentals (`OVERVIEW`) and scored headlines
//! (`NEWS_SENTIMENT`). The free tier allows 5 requests per minute; every
//! request waits on a shared rate limiter first.

use crate::error::{MarketError, Result};
use crate::types::{CompanyProfile, NewsArticle};
use chrono::{NaiveDateTime, TimeZone, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER: &str = "Alpha Vantage";
const DEFAULT_RATE_LIMIT: NonZeroU32 = NonZeroU32::MIN.saturating_add(4);

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

#[derive(Debug, Clone)]
pub struct AlphaVantageClient {
    client: Client,
    api_key: String,
    rate_limiter: SharedRateLimiter,
}

impl AlphaVantageClient {
    /// `rate_limit` is requests per minute; 0 falls back to the free-tier 5
    pub fn new(api_key: impl Into<String>, rate_limit: u32) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(rate_limit).unwrap_or(DEFAULT_RATE_LIMIT));
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    async fn query(&self, params: &[(&str, &str)]) -> Result<Value> {
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .get(BASE_URL)
            .query(params)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(MarketError::provider(
                PROVIDER,
                format!("HTTP error: {}", response.status()),
            ));
        }

        let data: Value = response.json().await?;
        check_payload(data)
    }

    pub async fn get_company_overview(&self, ticker: &str) -> Result<CompanyProfile> {
        let data = self
            .query(&[("function", "OVERVIEW"), ("symbol", ticker)])
            .await?;
        parse_overview(ticker, &data)
    }

    pub async fn get_news_sentiment(&self, ticker: &str, limit: usize) -> Result<Vec<NewsArticle>> {
        let limit_param = limit.to_string();
        let data = self
            .query(&[
                ("function", "NEWS_SENTIMENT"),
                ("tickers", ticker),
                ("sort", "LATEST"),
                ("limit", limit_param.as_str()),
            ])
            .await?;
        Ok(parse_news_feed(&data, limit))
    }
}

/// Reject error and throttling payloads, which arrive with HTTP 200
fn check_payload(data: Value) -> Result<Value> {
    if let Some(error) = data.get("Error Message").and_then(Value::as_str) {
        return Err(MarketError::provider(PROVIDER, error));
    }
    if data.get("Note").is_some() || data.get("Information").is_some() {
        return Err(MarketError::RateLimited {
            provider: PROVIDER.to_string(),
        });
    }
    Ok(data)
}

/// Alpha Vantage encodes numbers as strings, with "None" or "-" for missing
fn number(data: &Value, field: &str) -> Option<f64> {
    data.get(field)?.as_str()?.parse().ok()
}

fn text(data: &Value, field: &str) -> Option<String> {
    data.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty() && *s != "None")
        .map(ToString::to_string)
}

fn parse_overview(ticker: &str, data: &Value) -> Result<CompanyProfile> {
    if data.as_object().is_none_or(serde_json::Map::is_empty) {
        return Err(MarketError::NotFound(ticker.to_string()));
    }

    Ok(CompanyProfile {
        ticker: ticker.to_string(),
        name: text(data, "Name"),
        sector: text(data, "Sector"),
        industry: text(data, "Industry"),
        employees: number(data, "FullTimeEmployees").map(|n| n as u64),
        description: text(data, "Description"),
        market_cap: number(data, "MarketCapitalization"),
        pe_ratio: number(data, "PERatio"),
        beta: number(data, "Beta"),
        fifty_two_week_high: number(data, "52WeekHigh"),
        fifty_two_week_low: number(data, "52WeekLow"),
    })
}

fn parse_news_feed(data: &Value, limit: usize) -> Vec<NewsArticle> {
    let Some(feed) = data.get("feed").and_then(Value::as_array) else {
        return Vec::new();
    };

    feed.iter()
        .filter_map(|item| {
            Some(NewsArticle {
                headline: text(item, "title")?,
                // e.g. 20250102T143000
                date: item
                    .get("time_published")
                    .and_then(Value::as_str)
                    .and_then(|t| NaiveDateTime::parse_from_str(t, "%Y%m%dT%H%M%S").ok())
                    .map(|t| Utc.from_utc_datetime(&t)),
                summary: text(item, "summary"),
                sentiment: text(item, "overall_sentiment_label"),
                source: text(item, "source"),
                url: text(item, "url"),
            })
        })
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_creation() {
        let client = AlphaVantageClient::new("test_key", 0);
        assert_eq!(client.api_key, "test_key");
    }

    #[test]
    fn test_check_payload() {
        assert!(check_payload(json!({"Symbol": "AAPL"})).is_ok());
        assert!(matches!(
            check_payload(json!({"Error Message": "Invalid API call"})),
            Err(MarketError::Provider { .. })
        ));
        assert!(matches!(
            check_payload(json!({"Note": "Thank you for using Alpha Vantage!"})),
            Err(MarketError::RateLimited { .. })
        ));
    }

    #[test]
    fn test_parse_overview() {
        let data = json!({
            "Symbol": "MSFT",
            "Name": "Microsoft Corporation",
            "Sector": "TECHNOLOGY",
            "Industry": "SERVICES-PREPACKAGED SOFTWARE",
            "Description": "Microsoft develops software.",
            "MarketCapitalization": "3100000000000",
            "PERatio": "35.5",
            "Beta": "None",
            "52WeekHigh": "468.35",
            "52WeekLow": "309.45"
        });
        let profile = parse_overview("MSFT", &data).unwrap();
        assert_eq!(profile.name.as_deref(), Some("Microsoft Corporation"));
        assert_eq!(profile.pe_ratio, Some(35.5));
        assert_eq!(profile.beta, None);
        assert_eq!(profile.fifty_two_week_low, Some(309.45));
        assert_eq!(profile.employees, None);
    }

    #[test]
    fn test_empty_overview_is_not_found() {
        assert!(matches!(
            parse_overview("ZZZZ", &json!({})),
            Err(MarketError::NotFound(_))
        ));
    }

    #[test]
    fn test_parse_news_feed() {
        let data = json!({"feed": [
            {"title": "Tesla deliveries beat estimates", "time_published": "20250102T143000",
             "summary": "Q4 deliveries rose.", "overall_sentiment_label": "Somewhat-Bullish",
             "source": "Reuters", "url": "https://example.com/1"},
            {"summary": "no title, skipped"},
            {"title": "Second", "time_published": "garbage"}
        ]});
        let articles = parse_news_feed(&data, 10);
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].sentiment.as_deref(), Some("Somewhat-Bullish"));
        assert_eq!(
            articles[0].date.map(|d| d.to_rfc3339()),
            Some("2025-01-02T14:30:00+00:00".to_string())
        );
        assert_eq!(articles[1].date, None);

        assert_eq!(parse_news_feed(&data, 1).len(), 1);
        assert!(parse_news_feed(&json!({}), 5).is_empty());
    }

    #[tokio::test]
    #[ignore] // Requires API key and network access
    async fn test_get_company_overview() {
        let key = std::env::var("ALPHA_VANTAGE_API_KEY").unwrap();
        let client = AlphaVantageClient::new(key, 5);
        let profile = client.get_company_overview("AAPL").await.unwrap();
        assert!(profile.name.unwrap().contains("Apple"));
    }
}
