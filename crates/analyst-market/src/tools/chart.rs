//! Chart generation tools

use analyst_core::{Error, Result as ToolResult};
use analyst_tools::{Tool, parse_params};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::stock_data::{parse_period, period_schema};
use crate::api::MarketData;
use crate::cache::{CacheKey, StockCache};
use crate::chart::{Series, render_comparison_chart, render_price_chart};
use crate::error::{MarketError, Result};
use crate::types::{Period, PriceBar, normalize_ticker};

pub const CREATE_CHART: &str = "create_chart";
pub const CREATE_COMPARISON: &str = "create_comparison";

#[derive(Debug, Deserialize)]
struct ChartParams {
    #[serde(alias = "symbol")]
    ticker: String,
    #[serde(default)]
    period: Option<String>,
}

/// Tickers as a JSON array or a comma-separated string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TickerList {
    List(Vec<String>),
    Joined(String),
}

impl TickerList {
    fn normalized(self) -> Result<Vec<String>> {
        let raw = match self {
            TickerList::List(list) => list,
            TickerList::Joined(joined) => joined.split(',').map(ToString::to_string).collect(),
        };

        let mut tickers = Vec::new();
        for ticker in raw.iter().filter(|t| !t.trim().is_empty()) {
            let ticker = normalize_ticker(ticker)?;
            if !tickers.contains(&ticker) {
                tickers.push(ticker);
            }
        }
        Ok(tickers)
    }
}

#[derive(Debug, Deserialize)]
struct ComparisonParams {
    #[serde(alias = "symbols")]
    tickers: TickerList,
    #[serde(default)]
    period: Option<String>,
}

/// Bars for a chart, through the cache shared with the data tools
async fn cached_history(
    market: &dyn MarketData,
    cache: &StockCache,
    ticker: &str,
    period: Period,
) -> Result<Vec<PriceBar>> {
    let key = CacheKey::new(ticker, "history", json!({ "period": period }));
    let value = cache
        .get_or_fetch(key, || async {
            let bars = market.history(ticker, period).await?;
            Ok::<_, MarketError>(serde_json::to_value(bars)?)
        })
        .await?;
    Ok(serde_json::from_value(value)?)
}

/// Closes on the dates every ticker traded, in the first ticker's order
fn align_by_date(histories: &[(String, Vec<PriceBar>)]) -> (Vec<String>, Vec<Series>) {
    let Some((_, first)) = histories.first() else {
        return (Vec::new(), Vec::new());
    };
    let shared: Vec<NaiveDate> = first
        .iter()
        .map(|b| b.date)
        .filter(|date| histories[1..].iter().all(|(_, bars)| bars.iter().any(|b| b.date == *date)))
        .collect();

    let series = histories
        .iter()
        .map(|(ticker, bars)| {
            let closes: HashMap<NaiveDate, f64> = bars.iter().map(|b| (b.date, b.close)).collect();
            Series {
                label: ticker.clone(),
                values: shared.iter().filter_map(|d| closes.get(d).copied()).collect(),
            }
        })
        .collect();

    (shared.iter().map(ToString::to_string).collect(), series)
}

fn saved(path: &Path, message: &str) -> Value {
    let filename = path.display().to_string();
    json!({
        "success": true,
        "filename": filename,
        "message": format!("{message} saved to {filename}"),
    })
}

/// Closing-price line chart for one ticker
pub struct CreateChartTool {
    market: Arc<dyn MarketData>,
    cache: StockCache,
    charts_dir: PathBuf,
}

impl CreateChartTool {
    pub fn new(market: Arc<dyn MarketData>, cache: StockCache, charts_dir: &Path) -> Self {
        Self {
            market,
            cache,
            charts_dir: charts_dir.to_path_buf(),
        }
    }

    async fn create(&self, params: ChartParams) -> Result<Value> {
        let ticker = normalize_ticker(&params.ticker)?;
        let period = parse_period(params.period.as_deref())?;
        let bars = cached_history(self.market.as_ref(), &self.cache, &ticker, period).await?;

        tokio::fs::create_dir_all(&self.charts_dir).await?;
        let path = self.charts_dir.join(format!("{ticker}_{period}.svg"));
        let title = format!("{ticker} - {period}");
        render_price_chart(&path, &title, &bars)?;

        tracing::info!(ticker = %ticker, path = %path.display(), "Chart created");
        Ok(saved(&path, "Chart"))
    }
}

#[async_trait]
impl Tool for CreateChartTool {
    async fn execute(&self, params: Value) -> ToolResult<Value> {
        let params = parse_params(CREATE_CHART, params)?;
        self.create(params)
            .await
            .map_err(|e| Error::tool(CREATE_CHART, e.to_string()))
    }

    fn name(&self) -> &str {
        CREATE_CHART
    }

    fn description(&self) -> &str {
        "Create a price chart for a ticker over a period and save it as an image file. \
         Returns the saved file path."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "ticker": {
                    "type": "string",
                    "description": "Stock ticker symbol (e.g., 'TSLA')"
                },
                "period": period_schema()
            },
            "required": ["ticker"]
        })
    }
}

/// Percentage-change comparison of several tickers
pub struct ComparisonTool {
    market: Arc<dyn MarketData>,
    cache: StockCache,
    charts_dir: PathBuf,
}

impl ComparisonTool {
    pub fn new(market: Arc<dyn MarketData>, cache: StockCache, charts_dir: &Path) -> Self {
        Self {
            market,
            cache,
            charts_dir: charts_dir.to_path_buf(),
        }
    }

    async fn create(&self, params: ComparisonParams) -> Result<Value> {
        let tickers = params.tickers.normalized()?;
        if tickers.len() < 2 {
            return Err(MarketError::InvalidArguments(format!(
                "need at least two tickers to compare, got {}",
                tickers.len()
            )));
        }
        let period = parse_period(params.period.as_deref())?;

        let mut histories = Vec::with_capacity(tickers.len());
        for ticker in &tickers {
            let bars = cached_history(self.market.as_ref(), &self.cache, ticker, period).await?;
            histories.push((ticker.clone(), bars));
        }
        let (dates, series) = align_by_date(&histories);
        if dates.is_empty() {
            return Err(MarketError::NotFound(format!(
                "no trading days shared by {}",
                tickers.join(", ")
            )));
        }

        tokio::fs::create_dir_all(&self.charts_dir).await?;
        let path = self
            .charts_dir
            .join(format!("comparison_{}_{period}.svg", tickers.join("_")));
        render_comparison_chart(&path, &format!("Comparison - {period}"), &dates, &series)?;

        tracing::info!(tickers = ?tickers, path = %path.display(), "Comparison chart created");
        Ok(saved(&path, "Comparison chart"))
    }
}

#[async_trait]
impl Tool for ComparisonTool {
    async fn execute(&self, params: Value) -> ToolResult<Value> {
        let params = parse_params(CREATE_COMPARISON, params)?;
        self.create(params)
            .await
            .map_err(|e| Error::tool(CREATE_COMPARISON, e.to_string()))
    }

    fn name(&self) -> &str {
        CREATE_COMPARISON
    }

    fn description(&self) -> &str {
        "Create a chart comparing the percentage performance of several tickers over a \
         period and save it as an image file. Returns the saved file path."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "tickers": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Ticker symbols to compare (e.g., ['AAPL', 'MSFT', 'GOOGL'])"
                },
                "period": period_schema()
            },
            "required": ["tickers"]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SampleMarketData;
    use std::time::Duration;

    fn tools(dir: &Path) -> (CreateChartTool, ComparisonTool) {
        let market: Arc<dyn MarketData> = Arc::new(SampleMarketData::new());
        let cache = StockCache::new(Duration::from_secs(60));
        (
            CreateChartTool::new(market.clone(), cache.clone(), dir),
            ComparisonTool::new(market, cache, dir),
        )
    }

    #[tokio::test]
    async fn test_create_chart() {
        let dir = tempfile::tempdir().unwrap();
        let charts = dir.path().join("charts");
        let (chart, _) = tools(&charts);

        let result = chart
            .execute(json!({"ticker": "tsla", "period": "6mo"}))
            .await
            .unwrap();

        let expected = charts.join("TSLA_6mo.svg");
        assert_eq!(result["success"], true);
        assert_eq!(result["filename"], expected.display().to_string());
        assert_eq!(
            result["message"],
            format!("Chart saved to {}", expected.display())
        );
        assert!(expected.exists());
    }

    #[tokio::test]
    async fn test_create_comparison_from_joined_string() {
        let dir = tempfile::tempdir().unwrap();
        let (_, comparison) = tools(dir.path());

        let result = comparison
            .execute(json!({"tickers": "AAPL, msft,GOOGL", "period": "1y"}))
            .await
            .unwrap();

        let expected = dir.path().join("comparison_AAPL_MSFT_GOOGL_1y.svg");
        assert!(expected.exists());
        assert!(result["message"]
            .as_str()
            .unwrap()
            .starts_with("Comparison chart saved to"));
    }

    #[tokio::test]
    async fn test_comparison_needs_two_tickers() {
        let dir = tempfile::tempdir().unwrap();
        let (_, comparison) = tools(dir.path());

        let err = comparison
            .execute(json!({"tickers": ["AAPL", "aapl"]}))
            .await
            .unwrap_err();
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("at least two"));
    }

    #[tokio::test]
    async fn test_chart_for_unknown_ticker_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (chart, _) = tools(dir.path());

        assert!(chart.execute(json!({"ticker": "ZZZZ"})).await.is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    fn bars(days: std::ops::RangeInclusive<u32>, close: f64) -> Vec<PriceBar> {
        days.map(|day| PriceBar {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            open: close,
            high: close,
            low: close,
            close: close + f64::from(day),
            volume: 1_000,
        })
        .collect()
    }

    #[test]
    fn test_align_by_date_uses_shared_days() {
        // a recent listing only has the last three sessions
        let histories = vec![
            ("AAPL".to_string(), bars(1..=5, 100.0)),
            ("ARM".to_string(), bars(3..=5, 50.0)),
        ];
        let (dates, series) = align_by_date(&histories);

        assert_eq!(dates, vec!["2024-03-03", "2024-03-04", "2024-03-05"]);
        assert_eq!(series[0].values, vec![103.0, 104.0, 105.0]);
        assert_eq!(series[1].values, vec![53.0, 54.0, 55.0]);
    }

    #[test]
    fn test_align_by_date_without_overlap() {
        let histories = vec![
            ("AAPL".to_string(), bars(1..=2, 100.0)),
            ("MSFT".to_string(), bars(4..=5, 300.0)),
        ];
        let (dates, series) = align_by_date(&histories);
        assert!(dates.is_empty());
        assert!(series.iter().all(|s| s.values.is_empty()));
    }

    #[test]
    fn test_ticker_list_variants() {
        let list: TickerList = serde_json::from_value(json!(["nvda", "AMD"])).unwrap();
        assert_eq!(list.normalized().unwrap(), vec!["NVDA", "AMD"]);

        let joined: TickerList = serde_json::from_value(json!("nvda,,amd")).unwrap();
        assert_eq!(joined.normalized().unwrap(), vec!["NVDA", "AMD"]);
    }
}
