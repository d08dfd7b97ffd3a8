//! Tool definition types for LLM tool use

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tool definition sent to the LLM provider
///
/// Describes a tool the model may call: its name, what it does and the JSON
/// schema of its arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (must match the tool in the registry)
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON schema for the tool's input parameters
    pub input_schema: Value,
}

impl ToolDefinition {
    /// Create a new tool definition
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// Key holding tool-call arguments that were not valid JSON
pub const RAW_ARGUMENTS_KEY: &str = "_raw_arguments";

/// Wrap argument text the model produced but that did not parse
pub fn malformed_arguments(raw: impl Into<String>) -> Value {
    let raw: String = raw.into();
    serde_json::json!({ RAW_ARGUMENTS_KEY: raw })
}

/// The original argument text when `input` came from [`malformed_arguments`]
pub fn raw_arguments(input: &Value) -> Option<&str> {
    let obj = input.as_object()?;
    if obj.len() != 1 {
        return None;
    }
    obj.get(RAW_ARGUMENTS_KEY)?.as_str()
}

/// Helpers to build JSON schemas for tool arguments
pub mod schema {
    use serde_json::{Value, json};

    /// Object schema with properties and required keys
    ///
    /// # Example
    ///
    /// ```
    /// use analyst_llm::tools::schema;
    /// use serde_json::json;
    ///
    /// let schema = schema::object(
    ///     json!({
    ///         "ticker": schema::string("Stock ticker symbol, e.g. AAPL"),
    ///         "limit": schema::integer("Maximum number of articles"),
    ///     }),
    ///     vec!["ticker"],
    /// );
    /// assert_eq!(schema["required"][0], "ticker");
    /// ```
    pub fn object(properties: Value, required: Vec<&str>) -> Value {
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    pub fn string(description: &str) -> Value {
        json!({
            "type": "string",
            "description": description,
        })
    }

    /// String restricted to a set of values, with a default
    pub fn string_enum(description: &str, values: &[&str], default: &str) -> Value {
        json!({
            "type": "string",
            "description": description,
            "enum": values,
            "default": default,
        })
    }

    pub fn integer(description: &str) -> Value {
        json!({
            "type": "integer",
            "description": description,
        })
    }

    pub fn array(description: &str, items: Value) -> Value {
        json!({
            "type": "array",
            "description": description,
            "items": items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_arguments() {
        let input = malformed_arguments("{\"ticker\": \"AAPL\"");
        assert_eq!(raw_arguments(&input), Some("{\"ticker\": \"AAPL\""));
        assert_eq!(raw_arguments(&json!({"ticker": "AAPL"})), None);
        assert_eq!(
            raw_arguments(&json!({RAW_ARGUMENTS_KEY: "x", "ticker": "AAPL"})),
            None
        );
    }

    #[test]
    fn test_tool_definition_creation() {
        let schema = schema::object(
            json!({
                "ticker": schema::string("Stock ticker symbol"),
            }),
            vec!["ticker"],
        );

        let tool = ToolDefinition::new("get_stock_price", "Get the latest price", schema.clone());
        assert_eq!(tool.name, "get_stock_price");
        assert_eq!(tool.input_schema, schema);
    }

    #[test]
    fn test_enum_and_array_schemas() {
        let period = schema::string_enum("Time period", &["1mo", "3mo"], "3mo");
        assert_eq!(period["enum"][1], "3mo");
        assert_eq!(period["default"], "3mo");

        let tickers = schema::array("Tickers to compare", schema::string("ticker"));
        assert_eq!(tickers["type"], "array");
        assert_eq!(tickers["items"]["type"], "string");
    }
}
