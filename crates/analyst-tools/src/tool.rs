//! Tool trait definition

use analyst_core::{Error, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A named operation an agent can call
///
/// Failures are reported as [`Error::ToolInvocation`]; the agent loop turns
/// them into tool-error results instead of aborting the run.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Execute the tool with JSON arguments matching [`Tool::input_schema`]
    async fn execute(&self, params: Value) -> Result<Value>;

    /// Unique name, as exposed to the model
    fn name(&self) -> &str;

    /// Description shown to the model
    fn description(&self) -> &str;

    /// JSON Schema of the arguments
    fn input_schema(&self) -> Value;
}

/// Deserialize tool arguments, reporting bad input as a tool error
///
/// ```
/// use analyst_tools::parse_params;
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize)]
/// struct Args { ticker: String }
///
/// let args: Args = parse_params("get_stock_price", serde_json::json!({"ticker": "AAPL"})).unwrap();
/// assert_eq!(args.ticker, "AAPL");
///
/// let err = parse_params::<Args>("get_stock_price", serde_json::json!({})).unwrap_err();
/// assert!(!err.is_fatal());
/// ```
pub fn parse_params<T: DeserializeOwned>(tool: &str, params: Value) -> Result<T> {
    serde_json::from_value(params)
        .map_err(|e| Error::tool(tool, format!("invalid arguments: {e}")))
}
