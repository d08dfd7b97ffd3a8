//! Registering discovered MCP tools into a [`ToolRegistry`]

use analyst_tools::ToolRegistry;
use std::sync::Arc;
use tracing::{debug, info};

use crate::client::manager::MCPClientManager;
use crate::config::{AgentMCPConfig, should_include_tool};
use crate::tool::MCPTool;

/// Wrap and register tools from connected servers
///
/// With a specialist entry only its servers are consulted and its allow/deny
/// rules applied; without one every connected server contributes everything.
/// Returns the number of tools registered.
pub async fn register_tools(
    client_manager: &Arc<MCPClientManager>,
    registry: &mut ToolRegistry,
    specialist: Option<&AgentMCPConfig>,
) -> usize {
    let servers = specialist.map(|s| s.mcp_servers.as_slice());
    let tools = client_manager.discover_tools(servers).await;

    let mut registered = 0;
    for info in tools {
        if specialist.is_some_and(|s| !should_include_tool(&info.definition.name, s)) {
            debug!(tool = %info.definition.name, "Skipping MCP tool (filtered)");
            continue;
        }

        debug!(tool = %info.definition.name, server = %info.server_name, "Registering MCP tool");
        registry.register(Arc::new(MCPTool::new(info, Arc::clone(client_manager))));
        registered += 1;
    }

    info!(registered, "Registered MCP tools");
    registered
}

/// Names of every tool the connected servers offer
pub async fn list_available_tools(client_manager: &MCPClientManager) -> Vec<String> {
    client_manager
        .discover_tools(None)
        .await
        .into_iter()
        .map(|t| t.definition.name)
        .collect()
}
