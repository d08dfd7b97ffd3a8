//! Wraps a discovered MCP tool as an [`analyst_tools::Tool`]

use analyst_tools::Tool;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::client::MCPContent;
use crate::client::manager::{MCPClientManager, MCPToolInfo};

/// A remote tool routed through the [`MCPClientManager`]
///
/// Transport failures and `isError` results both surface as
/// `Error::ToolInvocation`, so a broken server never aborts a specialist.
pub struct MCPTool {
    info: MCPToolInfo,
    client_manager: Arc<MCPClientManager>,
}

impl MCPTool {
    pub fn new(info: MCPToolInfo, client_manager: Arc<MCPClientManager>) -> Self {
        Self {
            info,
            client_manager,
        }
    }

    pub fn server_name(&self) -> &str {
        &self.info.server_name
    }

    /// A lone text block holding a JSON object is returned as that object.
    /// Otherwise text blocks are joined and images and resources summarized.
    fn convert_mcp_result(content: Vec<MCPContent>) -> Value {
        if let [MCPContent::Text { text }] = content.as_slice() {
            if let Ok(object @ Value::Object(_)) = serde_json::from_str::<Value>(text) {
                return object;
            }
        }

        let mut text_parts = Vec::new();
        let mut attachments = Vec::new();

        for block in content {
            match block {
                MCPContent::Text { text } => text_parts.push(text),
                MCPContent::Image { data, mime_type } => attachments.push(json!({
                    "type": "image",
                    "mimeType": mime_type,
                    "dataLength": data.len(),
                })),
                MCPContent::Resource { uri, mime_type } => attachments.push(json!({
                    "type": "resource",
                    "uri": uri,
                    "mimeType": mime_type,
                })),
            }
        }

        let mut result = json!({ "text": text_parts.join("\n") });
        if !attachments.is_empty() {
            result["attachments"] = Value::Array(attachments);
        }
        result
    }
}

#[async_trait]
impl Tool for MCPTool {
    async fn execute(&self, params: Value) -> analyst_core::Result<Value> {
        let name = &self.info.definition.name;
        let result = self
            .client_manager
            .call_tool(&self.info.server_name, name, params)
            .await
            .map_err(|e| analyst_core::Error::tool(name, e.to_string()))?;

        if result.is_error.unwrap_or(false) {
            let text = result.text();
            let message = if text.is_empty() {
                format!("server '{}' reported an error", self.info.server_name)
            } else {
                text
            };
            return Err(analyst_core::Error::tool(name, message));
        }

        Ok(Self::convert_mcp_result(result.content))
    }

    fn name(&self) -> &str {
        &self.info.definition.name
    }

    fn description(&self) -> &str {
        self.info
            .definition
            .description
            .as_deref()
            .unwrap_or("No description available")
    }

    fn input_schema(&self) -> Value {
        self.info.definition.input_schema.clone()
    }
}
