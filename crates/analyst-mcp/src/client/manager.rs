//! Connection manager for the configured tool servers

use super::stdio::StdioMCPClient;
use super::{ArcMCPClient, MCPToolDefinition, MCPToolResult};
use crate::Result;
use crate::config::{MCPConfig, MCPServerConfig};
use crate::error::MCPError;
use crate::retry::RetryPolicy;
use futures::future::join_all;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// A discovered tool together with the server that provides it
#[derive(Debug, Clone)]
pub struct MCPToolInfo {
    pub server_name: String,
    pub definition: MCPToolDefinition,
}

/// Owns one client per configured server
///
/// Servers that fail to start are logged and skipped; the analyst keeps
/// working with whatever tools remain.
pub struct MCPClientManager {
    config: Arc<MCPConfig>,
    clients: Arc<RwLock<HashMap<String, ArcMCPClient>>>,
    retry_policy: RetryPolicy,
}

impl MCPClientManager {
    pub fn new(config: Arc<MCPConfig>) -> Self {
        Self {
            config,
            clients: Arc::new(RwLock::new(HashMap::new())),
            retry_policy: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn config(&self) -> &MCPConfig {
        &self.config
    }

    /// Connect every configured server concurrently
    pub async fn initialize(&self) -> Result<()> {
        let attempts = self.config.mcp_servers.iter().map(|(name, server)| async move {
            let outcome = self.create_and_connect_client(server, name).await;
            (name.clone(), outcome)
        });

        let mut clients = self.clients.write().await;
        for (server_name, outcome) in join_all(attempts).await {
            match outcome {
                Ok(client) => {
                    clients.insert(server_name, client);
                }
                Err(e) => {
                    warn!(server = %server_name, error = %e, "MCP server unavailable, continuing without it");
                }
            }
        }

        info!(
            connected = clients.len(),
            configured = self.config.mcp_servers.len(),
            "MCP servers initialized"
        );
        Ok(())
    }

    async fn create_and_connect_client(
        &self,
        config: &MCPServerConfig,
        server_name: &str,
    ) -> Result<ArcMCPClient> {
        let operation = format!("connect {server_name}");
        self.retry_policy
            .execute(&operation, || async move {
                let client: ArcMCPClient = Arc::new(StdioMCPClient::from_config(config));
                client.connect().await?;
                if !client.is_connected() {
                    return Err(MCPError::ConnectionFailed(format!(
                        "{server_name} reports not connected after connect()"
                    )));
                }
                Ok(client)
            })
            .await
    }

    /// List tools from connected servers, optionally restricted to `servers`
    pub async fn discover_tools(&self, servers: Option<&[String]>) -> Vec<MCPToolInfo> {
        let clients = self.clients.read().await;
        let mut all_tools = Vec::new();

        for (server_name, client) in clients.iter() {
            if servers.is_some_and(|wanted| !wanted.contains(server_name)) {
                continue;
            }
            match client.list_tools().await {
                Ok(tools) => {
                    info!(server = %server_name, count = tools.len(), "Discovered MCP tools");
                    all_tools.extend(tools.into_iter().map(|definition| MCPToolInfo {
                        server_name: server_name.clone(),
                        definition,
                    }));
                }
                Err(e) => {
                    warn!(server = %server_name, error = %e, "Failed to list MCP tools");
                }
            }
        }

        all_tools.sort_by(|a, b| a.definition.name.cmp(&b.definition.name));
        all_tools
    }

    pub async fn call_tool(
        &self,
        server_name: &str,
        tool_name: &str,
        arguments: Value,
    ) -> Result<MCPToolResult> {
        let client = self
            .clients
            .read()
            .await
            .get(server_name)
            .cloned()
            .ok_or_else(|| MCPError::ServerNotFound(server_name.to_string()))?;

        client.call_tool(tool_name, arguments).await
    }

    pub async fn connected_servers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.clients.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn has_connections(&self) -> bool {
        !self.clients.read().await.is_empty()
    }

    /// Disconnect every server
    pub async fn shutdown(&self) {
        let mut clients = self.clients.write().await;
        for (server_name, client) in clients.iter() {
            if let Err(e) = client.disconnect().await {
                warn!(server = %server_name, error = %e, "Error disconnecting MCP server");
            }
        }
        clients.clear();
        info!("All MCP servers disconnected");
    }

    /// Replace a server's client with a fresh connection
    pub async fn reconnect(&self, server_name: &str) -> Result<()> {
        let server_config = self
            .config
            .mcp_servers
            .get(server_name)
            .ok_or_else(|| MCPError::ServerNotFound(server_name.to_string()))?;

        let client = self
            .create_and_connect_client(server_config, server_name)
            .await?;
        self.clients
            .write()
            .await
            .insert(server_name.to_string(), client);

        info!(server = %server_name, "Reconnected to MCP server");
        Ok(())
    }

    /// Connection status per server
    pub async fn health_check(&self) -> HashMap<String, bool> {
        self.clients
            .read()
            .await
            .iter()
            .map(|(name, client)| (name.clone(), client.is_connected()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(command: &str) -> MCPConfig {
        let mut config = MCPConfig::default();
        config.mcp_servers.insert(
            "filings".to_string(),
            MCPServerConfig {
                command: command.to_string(),
                args: vec![],
                env: HashMap::new(),
                cwd: None,
            },
        );
        config
    }

    #[tokio::test]
    async fn test_manager_creation() {
        let manager = MCPClientManager::new(Arc::new(MCPConfig::default()));
        assert!(!manager.has_connections().await);
        assert!(manager.connected_servers().await.is_empty());
        assert!(manager.discover_tools(None).await.is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_server_degrades_gracefully() {
        let manager = MCPClientManager::new(Arc::new(config_with("/nonexistent/filings-mcp")))
            .with_retry_policy(RetryPolicy::fast());

        assert!(manager.initialize().await.is_ok());
        assert!(!manager.has_connections().await);
        assert!(manager.health_check().await.is_empty());
    }

    #[tokio::test]
    async fn test_call_tool_on_unknown_server() {
        let manager = MCPClientManager::new(Arc::new(MCPConfig::default()));
        let err = manager
            .call_tool("filings", "get_sec_filings", Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, MCPError::ServerNotFound(_)));
    }

    #[tokio::test]
    async fn test_reconnect_unknown_server() {
        let manager = MCPClientManager::new(Arc::new(MCPConfig::default()));
        assert!(matches!(
            manager.reconnect("missing").await,
            Err(MCPError::ServerNotFound(_))
        ));
    }
}
