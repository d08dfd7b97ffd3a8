//! MCP client implementations

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::Result;

pub mod manager;
pub mod stdio;

/// Protocol revision sent in `initialize`
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Transport-agnostic MCP client
///
/// All methods take `&self` so clients can be shared through `Arc`;
/// implementations keep their state behind interior mutability.
#[async_trait]
pub trait MCPClient: Send + Sync {
    /// Start the server and run the initialize handshake
    async fn connect(&self) -> Result<()>;

    fn is_connected(&self) -> bool;

    async fn disconnect(&self) -> Result<()>;

    /// `tools/list`
    async fn list_tools(&self) -> Result<Vec<MCPToolDefinition>>;

    /// `tools/call`
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<MCPToolResult>;

    /// Server identity captured during the handshake
    async fn server_info(&self) -> Option<MCPServerInfo>;
}

/// Tool definition as returned by `tools/list`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MCPToolDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Result of `tools/call`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MCPToolResult {
    pub content: Vec<MCPContent>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "isError")]
    pub is_error: Option<bool>,
}

impl MCPToolResult {
    /// Concatenated text blocks of the result
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| match c {
                MCPContent::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Content block inside a tool result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MCPContent {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Resource {
        uri: String,
        #[serde(default, skip_serializing_if = "Option::is_none", rename = "mimeType")]
        mime_type: Option<String>,
    },
}

/// Server identity (from initialize)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MCPServerInfo {
    pub name: String,
    pub version: String,
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
}

impl MCPServerInfo {
    /// Read server identity out of an `initialize` result, tolerating missing fields
    pub fn from_initialize(result: &Value) -> Self {
        let field = |v: &Value, default: &str| v.as_str().unwrap_or(default).to_string();
        Self {
            name: field(&result["serverInfo"]["name"], "unknown"),
            version: field(&result["serverInfo"]["version"], "unknown"),
            protocol_version: field(&result["protocolVersion"], PROTOCOL_VERSION),
        }
    }
}

/// Type alias for Arc-wrapped MCP client
pub type ArcMCPClient = Arc<dyn MCPClient>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_result_text_joins_text_blocks() {
        let result: MCPToolResult = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "EPS beat"},
                {"type": "image", "data": "AAAA", "mimeType": "image/png"},
                {"type": "text", "text": "Guidance raised"}
            ]
        }))
        .unwrap();
        assert_eq!(result.text(), "EPS beat\nGuidance raised");
        assert!(result.is_error.is_none());
    }

    #[test]
    fn test_server_info_defaults() {
        let info = MCPServerInfo::from_initialize(&json!({"serverInfo": {"name": "filings"}}));
        assert_eq!(info.name, "filings");
        assert_eq!(info.version, "unknown");
        assert_eq!(info.protocol_version, PROTOCOL_VERSION);
    }
}
