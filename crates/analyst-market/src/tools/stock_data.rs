//! Price, history and company information tools

use analyst_core::{Error, Result as ToolResult};
use analyst_tools::{Tool, parse_params};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use super::{annotate, round2};
use crate::api::MarketData;
use crate::cache::{CacheKey, StockCache};
use crate::error::{MarketError, Result};
use crate::types::{Period, PriceBar, normalize_ticker};

pub const STOCK_PRICE: &str = "get_stock_price";
pub const HISTORICAL_DATA: &str = "get_historical_data";
pub const STOCK_INFO: &str = "get_stock_info";

#[derive(Debug, Deserialize)]
struct TickerParams {
    #[serde(alias = "symbol")]
    ticker: String,
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    #[serde(alias = "symbol")]
    ticker: String,
    #[serde(default)]
    period: Option<String>,
}

/// Parse an optional period argument, defaulting to three months
pub(crate) fn parse_period(period: Option<&str>) -> Result<Period> {
    period.map_or(Ok(Period::default()), str::parse)
}

fn ticker_schema(extra: Option<(&str, Value)>) -> Value {
    let mut properties = json!({
        "ticker": {
            "type": "string",
            "description": "Stock ticker symbol (e.g., 'AAPL', 'MSFT')"
        }
    });
    if let Some((name, schema)) = extra {
        properties[name] = schema;
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": ["ticker"]
    })
}

pub(crate) fn period_schema() -> Value {
    json!({
        "type": "string",
        "description": "Time period",
        "enum": Period::ALL.map(Period::as_str),
        "default": "3mo"
    })
}

/// Current quote for a ticker
pub struct StockPriceTool {
    market: Arc<dyn MarketData>,
    cache: StockCache,
}

impl StockPriceTool {
    pub fn new(market: Arc<dyn MarketData>, cache: StockCache) -> Self {
        Self { market, cache }
    }

    async fn fetch(&self, params: TickerParams) -> Result<Value> {
        let ticker = normalize_ticker(&params.ticker)?;
        let key = CacheKey::new(&ticker, STOCK_PRICE, json!({}));

        self.cache
            .get_or_fetch(key, || async {
                let quote = self.market.quote(&ticker).await?;
                Ok::<_, MarketError>(annotate(
                    json!({
                        "ticker": quote.ticker,
                        "current_price": round2(quote.price),
                        "day_high": round2(quote.day_high),
                        "day_low": round2(quote.day_low),
                        "open": round2(quote.open),
                        "volume": quote.volume,
                        "timestamp": quote.timestamp.to_rfc3339(),
                    }),
                    self.market.as_ref(),
                ))
            })
            .await
    }
}

#[async_trait]
impl Tool for StockPriceTool {
    async fn execute(&self, params: Value) -> ToolResult<Value> {
        let params = parse_params(STOCK_PRICE, params)?;
        self.fetch(params)
            .await
            .map_err(|e| Error::tool(STOCK_PRICE, e.to_string()))
    }

    fn name(&self) -> &str {
        STOCK_PRICE
    }

    fn description(&self) -> &str {
        "Get the current stock price, day range and volume for a ticker symbol."
    }

    fn input_schema(&self) -> Value {
        ticker_schema(None)
    }
}

fn summarize(bars: &[PriceBar]) -> Value {
    let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
        return Value::Null;
    };
    let average = bars.iter().map(|b| b.close).sum::<f64>() / bars.len() as f64;
    let change = if first.close == 0.0 {
        0.0
    } else {
        (last.close / first.close - 1.0) * 100.0
    };

    json!({
        "start_price": round2(first.close),
        "end_price": round2(last.close),
        "change_percent": round2(change),
        "average": round2(average),
        "high": bars.iter().map(|b| b.high).reduce(f64::max).map(round2),
        "low": bars.iter().map(|b| b.low).reduce(f64::min).map(round2),
    })
}

/// Daily OHLCV bars with a summary
pub struct HistoricalDataTool {
    market: Arc<dyn MarketData>,
    cache: StockCache,
}

impl HistoricalDataTool {
    pub fn new(market: Arc<dyn MarketData>, cache: StockCache) -> Self {
        Self { market, cache }
    }

    async fn fetch(&self, params: HistoryParams) -> Result<Value> {
        let ticker = normalize_ticker(&params.ticker)?;
        let period = parse_period(params.period.as_deref())?;
        let key = CacheKey::new(&ticker, HISTORICAL_DATA, json!({ "period": period }));

        self.cache
            .get_or_fetch(key, || async {
                let bars = self.market.history(&ticker, period).await?;
                let data: Vec<Value> = bars
                    .iter()
                    .map(|b| {
                        json!({
                            "date": b.date.to_string(),
                            "open": round2(b.open),
                            "high": round2(b.high),
                            "low": round2(b.low),
                            "close": round2(b.close),
                            "volume": b.volume,
                        })
                    })
                    .collect();

                Ok::<_, MarketError>(annotate(
                    json!({
                        "ticker": ticker,
                        "period": period,
                        "data": data,
                        "summary": summarize(&bars),
                    }),
                    self.market.as_ref(),
                ))
            })
            .await
    }
}

#[async_trait]
impl Tool for HistoricalDataTool {
    async fn execute(&self, params: Value) -> ToolResult<Value> {
        let params = parse_params(HISTORICAL_DATA, params)?;
        self.fetch(params)
            .await
            .map_err(|e| Error::tool(HISTORICAL_DATA, e.to_string()))
    }

    fn name(&self) -> &str {
        HISTORICAL_DATA
    }

    fn description(&self) -> &str {
        "Get daily historical prices (open, high, low, close, volume) for a ticker \
         over a period, with start/end price, percent change, average, high and low."
    }

    fn input_schema(&self) -> Value {
        ticker_schema(Some(("period", period_schema())))
    }
}

/// Company profile and valuation figures
pub struct StockInfoTool {
    market: Arc<dyn MarketData>,
    cache: StockCache,
}

impl StockInfoTool {
    pub fn new(market: Arc<dyn MarketData>, cache: StockCache) -> Self {
        Self { market, cache }
    }

    async fn fetch(&self, params: TickerParams) -> Result<Value> {
        let ticker = normalize_ticker(&params.ticker)?;
        let key = CacheKey::new(&ticker, STOCK_INFO, json!({}));

        self.cache
            .get_or_fetch(key, || async {
                let profile = self.market.profile(&ticker).await?;
                Ok::<_, MarketError>(annotate(serde_json::to_value(profile)?, self.market.as_ref()))
            })
            .await
    }
}

#[async_trait]
impl Tool for StockInfoTool {
    async fn execute(&self, params: Value) -> ToolResult<Value> {
        let params = parse_params(STOCK_INFO, params)?;
        self.fetch(params)
            .await
            .map_err(|e| Error::tool(STOCK_INFO, e.to_string()))
    }

    fn name(&self) -> &str {
        STOCK_INFO
    }

    fn description(&self) -> &str {
        "Get company information for a ticker: name, sector, industry, employees, \
         description, market cap, P/E ratio, beta and 52-week range."
    }

    fn input_schema(&self) -> Value {
        ticker_schema(None)
    }
}
