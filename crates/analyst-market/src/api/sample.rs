//! Deterministic offline market data
//!
//! Serves a small universe of large-cap tickers with fixed figures so the
//! workflow can be demoed without network access or when the data APIs are
//! throttled. Unknown tickers behave like they do live: `NotFound`.

use crate::error::{MarketError, Result};
use crate::types::{CompanyProfile, NewsArticle, Period, PriceBar, Quote};
use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use std::f64::consts::PI;

use super::MarketData;

struct Company {
    ticker: &'static str,
    name: &'static str,
    sector: &'static str,
    industry: &'static str,
    employees: u64,
}

const UNIVERSE: &[Company] = &[
    Company { ticker: "AAPL", name: "Apple Inc.", sector: "Technology", industry: "Consumer Electronics", employees: 164_000 },
    Company { ticker: "MSFT", name: "Microsoft Corporation", sector: "Technology", industry: "Software", employees: 221_000 },
    Company { ticker: "GOOGL", name: "Alphabet Inc.", sector: "Communication Services", industry: "Internet Content & Information", employees: 182_000 },
    Company { ticker: "AMZN", name: "Amazon.com, Inc.", sector: "Consumer Cyclical", industry: "Internet Retail", employees: 1_525_000 },
    Company { ticker: "META", name: "Meta Platforms, Inc.", sector: "Communication Services", industry: "Internet Content & Information", employees: 67_000 },
    Company { ticker: "NVDA", name: "NVIDIA Corporation", sector: "Technology", industry: "Semiconductors", employees: 29_600 },
    Company { ticker: "TSLA", name: "Tesla, Inc.", sector: "Consumer Cyclical", industry: "Auto Manufacturers", employees: 140_000 },
];

const PRICE: f64 = 420.69;
const DAY_HIGH: f64 = 425.0;
const DAY_LOW: f64 = 415.0;
const VOLUME: u64 = 1_000_000;
const MARKET_CAP: f64 = 2.5e12;

/// History runs from 100 to 110 with a wiggle that vanishes at both ends
const HISTORY_START: f64 = 100.0;
const HISTORY_END: f64 = 110.0;
const WIGGLE: f64 = 4.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct SampleMarketData;

impl SampleMarketData {
    pub fn new() -> Self {
        Self
    }

    fn company(ticker: &str) -> Result<&'static Company> {
        UNIVERSE
            .iter()
            .find(|c| c.ticker == ticker)
            .ok_or_else(|| MarketError::NotFound(ticker.to_string()))
    }

    /// Tickers served by this provider
    pub fn tickers() -> impl Iterator<Item = &'static str> {
        UNIVERSE.iter().map(|c| c.ticker)
    }
}

/// The `count` most recent weekdays up to `end`, oldest first
fn business_days(end: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(count);
    let mut day = end;
    while days.len() < count {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            days.push(day);
        }
        day -= Duration::days(1);
    }
    days.reverse();
    days
}

fn sample_bars(end: NaiveDate, period: Period) -> Vec<PriceBar> {
    let days = business_days(end, period.trading_days(end));
    let last = days.len().saturating_sub(1).max(1) as f64;

    let mut previous_close = HISTORY_START;
    days.into_iter()
        .enumerate()
        .map(|(i, date)| {
            let t = i as f64 / last;
            let close = HISTORY_START
                + (HISTORY_END - HISTORY_START) * t
                + WIGGLE * (2.0 * PI * t).sin();
            let bar = PriceBar {
                date,
                open: previous_close,
                high: close.max(previous_close) + 1.0,
                low: close.min(previous_close) - 1.0,
                close,
                volume: VOLUME,
            };
            previous_close = close;
            bar
        })
        .collect()
}

#[async_trait]
impl MarketData for SampleMarketData {
    fn name(&self) -> &'static str {
        "sample"
    }

    fn is_sample(&self) -> bool {
        true
    }

    async fn quote(&self, ticker: &str) -> Result<Quote> {
        let company = Self::company(ticker)?;
        Ok(Quote {
            ticker: company.ticker.to_string(),
            price: PRICE,
            open: DAY_LOW + 2.5,
            day_high: DAY_HIGH,
            day_low: DAY_LOW,
            volume: VOLUME,
            timestamp: Utc::now(),
        })
    }

    async fn history(&self, ticker: &str, period: Period) -> Result<Vec<PriceBar>> {
        Self::company(ticker)?;
        Ok(sample_bars(Utc::now().date_naive(), period))
    }

    async fn profile(&self, ticker: &str) -> Result<CompanyProfile> {
        let company = Self::company(ticker)?;
        Ok(CompanyProfile {
            ticker: company.ticker.to_string(),
            name: Some(company.name.to_string()),
            sector: Some(company.sector.to_string()),
            industry: Some(company.industry.to_string()),
            employees: Some(company.employees),
            description: Some(format!(
                "{} ({}) operates in the {} industry.",
                company.name, company.ticker, company.industry
            )),
            market_cap: Some(MARKET_CAP),
            pe_ratio: Some(35.5),
            beta: Some(1.2),
            fifty_two_week_high: Some(450.0),
            fifty_two_week_low: Some(300.0),
        })
    }

    async fn news(&self, ticker: &str, limit: usize) -> Result<Vec<NewsArticle>> {
        let company = Self::company(ticker)?;
        let now = Utc::now();
        let headlines = [
            (format!("{} shares edge higher ahead of earnings", company.name), "Neutral"),
            (format!("Analysts raise price targets on {}", company.ticker), "Somewhat-Bullish"),
            (format!("{} faces regulatory questions in Europe", company.name), "Somewhat-Bearish"),
        ];

        Ok(headlines
            .into_iter()
            .zip(0_i64..)
            .take(limit)
            .map(|((headline, sentiment), age)| NewsArticle {
                summary: Some(format!("Sample coverage: {headline}.")),
                headline,
                date: Some(now - Duration::days(age)),
                sentiment: Some(sentiment.to_string()),
                source: Some("Sample Wire".to_string()),
                url: None,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_quote_figures() {
        let quote = SampleMarketData::new().quote("AAPL").await.unwrap();
        assert!((quote.price - 420.69).abs() < f64::EPSILON);
        assert!((quote.day_high - 425.0).abs() < f64::EPSILON);
        assert!((quote.day_low - 415.0).abs() < f64::EPSILON);
        assert_eq!(quote.volume, 1_000_000);
    }

    #[tokio::test]
    async fn test_unknown_ticker_is_not_found() {
        let market = SampleMarketData::new();
        assert!(matches!(market.quote("ZZZZ").await, Err(MarketError::NotFound(_))));
        assert!(matches!(
            market.history("ZZZZ", Period::OneMonth).await,
            Err(MarketError::NotFound(_))
        ));
    }

    #[test]
    fn test_history_shape() {
        let end = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let bars = sample_bars(end, Period::ThreeMonths);

        assert_eq!(bars.len(), 63);
        assert_eq!(bars.last().unwrap().date, end);
        assert!((bars[0].close - 100.0).abs() < 1e-9);
        assert!((bars.last().unwrap().close - 110.0).abs() < 1e-9);
        assert!(bars.iter().all(|b| b.low < b.close && b.close < b.high));
        assert!(bars
            .iter()
            .all(|b| !matches!(b.date.weekday(), Weekday::Sat | Weekday::Sun)));
        assert!(bars.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_single_day_history() {
        // 2025-03-16 is a Sunday; the bar falls on the preceding Friday
        let bars = sample_bars(NaiveDate::from_ymd_opt(2025, 3, 16).unwrap(), Period::OneDay);
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2025, 3, 14).unwrap());
    }

    #[tokio::test]
    async fn test_profile_and_news() {
        let market = SampleMarketData::new();
        let profile = market.profile("TSLA").await.unwrap();
        assert_eq!(profile.name.as_deref(), Some("Tesla, Inc."));
        assert_eq!(profile.beta, Some(1.2));

        let news = market.news("TSLA", 2).await.unwrap();
        assert_eq!(news.len(), 2);
        assert!(news[0].headline.contains("Tesla"));
        assert!(news[0].date > news[1].date);
    }

    #[test]
    fn test_universe() {
        assert!(SampleMarketData::tickers().any(|t| t == "NVDA"));
    }
}
