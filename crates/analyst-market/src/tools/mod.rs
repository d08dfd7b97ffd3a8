//! The analyst tool set
//!
//! | Tool | Specialist |
//! |------|------------|
//! | `get_stock_price`, `get_historical_data`, `get_stock_info` | data analyst |
//! | `create_chart`, `create_comparison` | chart specialist |
//! | `get_stock_news` | news analyst |
//! | `save_report` | report writer |

pub mod chart;
pub mod news;
pub mod report;
pub mod stock_data;

pub use chart::{ComparisonTool, CreateChartTool};
pub use news::StockNewsTool;
pub use report::SaveReportTool;
pub use stock_data::{HistoricalDataTool, StockInfoTool, StockPriceTool};

use crate::api::{MarketData, build_provider};
use crate::cache::StockCache;
use analyst_tools::ToolRegistry;
use analyst_utils::AnalystConfig;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

/// Round to cents for display
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Mark results served from canned figures
pub(crate) fn annotate(mut value: Value, market: &dyn MarketData) -> Value {
    if market.is_sample() {
        if let Some(obj) = value.as_object_mut() {
            obj.insert("note".to_string(), json!("Sample data"));
        }
    }
    value
}

/// All seven tools backed by `market`
pub fn market_tools(market: Arc<dyn MarketData>, config: &AnalystConfig) -> ToolRegistry {
    let cache = StockCache::new(Duration::from_secs(config.market.cache_ttl_secs));
    let output = &config.output;

    ToolRegistry::new()
        .with_tool(Arc::new(StockPriceTool::new(market.clone(), cache.clone())))
        .with_tool(Arc::new(HistoricalDataTool::new(market.clone(), cache.clone())))
        .with_tool(Arc::new(StockInfoTool::new(market.clone(), cache.clone())))
        .with_tool(Arc::new(CreateChartTool::new(market.clone(), cache.clone(), &output.charts_dir)))
        .with_tool(Arc::new(ComparisonTool::new(market.clone(), cache.clone(), &output.charts_dir)))
        .with_tool(Arc::new(StockNewsTool::new(market, cache, config.market.news_limit)))
        .with_tool(Arc::new(SaveReportTool::new(&output.reports_dir)))
}

/// All seven tools backed by the configured provider
pub fn register_all(config: &AnalystConfig) -> ToolRegistry {
    market_tools(build_provider(&config.market), config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SampleMarketData;

    #[test]
    fn test_market_tools_registers_all_seven() {
        let registry = market_tools(Arc::new(SampleMarketData::new()), &AnalystConfig::default());
        assert_eq!(
            registry.names(),
            vec![
                "create_chart",
                "create_comparison",
                "get_historical_data",
                "get_stock_info",
                "get_stock_news",
                "get_stock_price",
                "save_report",
            ]
        );
        for tool in registry.list_tools() {
            assert_eq!(tool.input_schema()["type"], "object", "{}", tool.name());
            assert!(!tool.description().is_empty());
        }
    }

    #[test]
    fn test_round2() {
        assert!((round2(420.694) - 420.69).abs() < f64::EPSILON);
        assert!((round2(-9.999) + 10.0).abs() < f64::EPSILON);
    }
}
