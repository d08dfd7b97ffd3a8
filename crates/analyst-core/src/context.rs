//! Analysis context shared between specialists
//!
//! `AnalysisContext` is an open key-value store that lets one specialist hand
//! intermediate artifacts (a fetched price series, a chart path) to a later
//! one without re-deriving them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known context keys
pub mod keys {
    /// Path of the most recently generated chart
    pub const LAST_CHART: &str = "last_chart";
    /// Path of the most recently saved report
    pub const LAST_REPORT: &str = "last_report";
    /// Ticker most recently queried by any tool
    pub const LAST_TICKER: &str = "last_ticker";
}

/// Key under which a tool result for a ticker is recorded, e.g.
/// `get_stock_price:AAPL`.
pub fn tool_result_key(tool: &str, ticker: &str) -> String {
    format!("{tool}:{}", ticker.to_uppercase())
}

/// Open mapping from string keys to structured values
///
/// # Example
///
/// ```
/// use analyst_core::AnalysisContext;
///
/// let mut ctx = AnalysisContext::new();
/// ctx.insert("last_ticker", serde_json::json!("AAPL"));
/// assert_eq!(ctx.last_ticker(), Some("AAPL"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisContext {
    data: BTreeMap<String, serde_json::Value>,
}

impl AnalysisContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the last generated chart, if any
    pub fn last_chart(&self) -> Option<&str> {
        self.get(keys::LAST_CHART).and_then(|v| v.as_str())
    }

    /// Path of the last saved report, if any
    pub fn last_report(&self) -> Option<&str> {
        self.get(keys::LAST_REPORT).and_then(|v| v.as_str())
    }

    /// Ticker most recently touched by a tool
    pub fn last_ticker(&self) -> Option<&str> {
        self.get(keys::LAST_TICKER).and_then(|v| v.as_str())
    }

    /// Insert a value, replacing any previous one
    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.data.insert(key.into(), value);
    }

    /// Get a value
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Insert a typed value, serializing it to JSON first
    pub fn insert_typed<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> crate::Result<()> {
        let json_value = serde_json::to_value(value).map_err(|e| {
            crate::Error::ProcessingFailed(format!("Failed to serialize context value: {e}"))
        })?;
        self.data.insert(key.into(), json_value);
        Ok(())
    }

    /// Get a typed value, deserializing it from JSON
    pub fn get_typed<T: for<'de> Deserialize<'de>>(&self, key: &str) -> crate::Result<Option<T>> {
        match self.data.get(key) {
            None => Ok(None),
            Some(value) => {
                let typed = serde_json::from_value(value.clone()).map_err(|e| {
                    crate::Error::ProcessingFailed(format!(
                        "Failed to deserialize context value: {e}"
                    ))
                })?;
                Ok(Some(typed))
            }
        }
    }

    /// Check if a key exists
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Iterate over entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.data.iter()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct PricePoint {
        date: String,
        close: f64,
    }

    #[test]
    fn test_basic_operations() {
        let mut ctx = AnalysisContext::new();
        assert!(ctx.is_empty());

        ctx.insert(keys::LAST_CHART, serde_json::json!("outputs/charts/AAPL_3mo.svg"));
        assert_eq!(ctx.len(), 1);
        assert!(ctx.contains_key(keys::LAST_CHART));
        assert_eq!(ctx.last_chart(), Some("outputs/charts/AAPL_3mo.svg"));
        assert_eq!(ctx.last_report(), None);
    }

    #[test]
    fn test_typed_insert_get() {
        let mut ctx = AnalysisContext::new();
        let series = vec![
            PricePoint {
                date: "2025-01-02".to_string(),
                close: 101.5,
            },
            PricePoint {
                date: "2025-01-03".to_string(),
                close: 102.0,
            },
        ];

        ctx.insert_typed("get_historical_data:AAPL", &series).unwrap();

        let retrieved: Vec<PricePoint> = ctx.get_typed("get_historical_data:AAPL").unwrap().unwrap();
        assert_eq!(retrieved, series);
    }

    #[test]
    fn test_get_typed_wrong_shape() {
        let mut ctx = AnalysisContext::new();
        ctx.insert("k", serde_json::json!("not a list"));
        let result: crate::Result<Option<Vec<PricePoint>>> = ctx.get_typed("k");
        assert!(result.is_err());
    }

    #[test]
    fn test_tool_result_key_uppercases_ticker() {
        assert_eq!(tool_result_key("get_stock_price", "aapl"), "get_stock_price:AAPL");
    }

    #[test]
    fn test_latest_value_wins() {
        let mut ctx = AnalysisContext::new();
        ctx.insert(keys::LAST_TICKER, serde_json::json!("AAPL"));
        ctx.insert(keys::LAST_TICKER, serde_json::json!("TSLA"));
        assert_eq!(ctx.last_ticker(), Some("TSLA"));
        assert_eq!(ctx.len(), 1);
    }
}
