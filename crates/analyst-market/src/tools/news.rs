//! Tool for fetching stock news

use analyst_core::{Error, Result as ToolResult};
use analyst_tools::{Tool, parse_params};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use super::annotate;
use crate::api::MarketData;
use crate::cache::{CacheKey, StockCache};
use crate::error::{MarketError, Result};
use crate::types::normalize_ticker;

pub const STOCK_NEWS: &str = "get_stock_news";

/// Upper bound on requested articles
const MAX_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
struct NewsParams {
    #[serde(alias = "symbol")]
    ticker: String,
    #[serde(default)]
    limit: Option<usize>,
}

pub struct StockNewsTool {
    market: Arc<dyn MarketData>,
    cache: StockCache,
    default_limit: usize,
}

impl StockNewsTool {
    pub fn new(market: Arc<dyn MarketData>, cache: StockCache, default_limit: usize) -> Self {
        Self {
            market,
            cache,
            default_limit,
        }
    }

    async fn fetch(&self, params: NewsParams) -> Result<Value> {
        let ticker = normalize_ticker(&params.ticker)?;
        let limit = params.limit.unwrap_or(self.default_limit).clamp(1, MAX_LIMIT);
        let key = CacheKey::new(&ticker, STOCK_NEWS, json!({ "limit": limit }));

        self.cache
            .get_or_fetch(key, || async {
                let articles: Vec<Value> = self
                    .market
                    .news(&ticker, limit)
                    .await?
                    .into_iter()
                    .map(|a| {
                        json!({
                            "headline": a.headline,
                            "date": a.date.map(|d| d.to_rfc3339()),
                            "summary": a.summary,
                            "sentiment": a.sentiment,
                            "source": a.source,
                            "url": a.url,
                        })
                    })
                    .collect();

                Ok::<_, MarketError>(annotate(
                    json!({ "ticker": ticker, "articles": articles }),
                    self.market.as_ref(),
                ))
            })
            .await
    }
}

#[async_trait]
impl Tool for StockNewsTool {
    async fn execute(&self, params: Value) -> ToolResult<Value> {
        let params = parse_params(STOCK_NEWS, params)?;
        self.fetch(params)
            .await
            .map_err(|e| Error::tool(STOCK_NEWS, e.to_string()))
    }

    fn name(&self) -> &str {
        STOCK_NEWS
    }

    fn description(&self) -> &str {
        "Get recent news headlines for a ticker, with date, summary, source and \
         sentiment where available."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "ticker": {
                    "type": "string",
                    "description": "Stock ticker symbol"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of articles",
                    "default": self.default_limit
                }
            },
            "required": ["ticker"]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SampleMarketData;
    use std::time::Duration;

    fn tool() -> StockNewsTool {
        StockNewsTool::new(
            Arc::new(SampleMarketData::new()),
            StockCache::new(Duration::from_secs(60)),
            10,
        )
    }

    #[tokio::test]
    async fn test_news_articles() {
        let result = tool().execute(json!({"ticker": "NVDA"})).await.unwrap();

        let articles = result["articles"].as_array().unwrap();
        assert_eq!(articles.len(), 3);
        assert!(articles[0]["headline"].as_str().unwrap().contains("NVIDIA"));
        assert!(articles[0]["sentiment"].is_string());
        assert_eq!(result["note"], "Sample data");
    }

    #[tokio::test]
    async fn test_news_limit() {
        let result = tool()
            .execute(json!({"ticker": "NVDA", "limit": 1}))
            .await
            .unwrap();
        assert_eq!(result["articles"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_news_unknown_ticker() {
        let err = tool().execute(json!({"ticker": "ZZZZ"})).await.unwrap_err();
        assert!(matches!(err, Error::ToolInvocation { ref tool, .. } if tool == STOCK_NEWS));
    }
}
