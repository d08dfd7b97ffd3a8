//! Model Context Protocol (MCP) tool servers for the financial analyst
//!
//! External tool servers are spawned over stdio, their tools discovered and
//! wrapped as ordinary [`analyst_tools::Tool`]s so the workflow can hand them
//! to specialists next to the built-in market tools.
//!
//! # Example
//!
//! ```no_run
//! use analyst_mcp::{MCPClientManager, MCPConfig, discovery};
//! use analyst_tools::ToolRegistry;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MCPConfig::from_file("mcp.json")?;
//! let manager = Arc::new(MCPClientManager::new(Arc::new(config)));
//! manager.initialize().await?;
//!
//! let mut registry = ToolRegistry::new();
//! let added = discovery::register_tools(&manager, &mut registry, None).await;
//! println!("Registered {added} MCP tools");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod retry;
pub mod tool;

pub use client::manager::MCPClientManager;
pub use config::{AgentMCPConfig, MCPConfig, MCPServerConfig};
pub use error::MCPError;
pub use retry::RetryPolicy;
pub use tool::MCPTool;

/// Result type for MCP operations
pub type Result<T> = std::result::Result<T, MCPError>;
