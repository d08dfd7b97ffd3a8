//! Stdio transport MCP client
//!
//! Spawns the server as a child process and speaks newline-delimited
//! JSON-RPC 2.0 over its stdin/stdout.

use super::{MCPClient, MCPServerInfo, MCPToolDefinition, MCPToolResult, PROTOCOL_VERSION};
use crate::Result;
use crate::config::MCPServerConfig;
use crate::error::MCPError;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, trace};

/// Pipes to a running server. Held under one lock so a request and its
/// response are never interleaved with another call.
struct Pipes {
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

/// MCP client using the stdio transport
pub struct StdioMCPClient {
    command: String,
    args: Vec<String>,
    env: HashMap<String, String>,
    cwd: Option<PathBuf>,

    child: Arc<Mutex<Option<Child>>>,
    pipes: Arc<Mutex<Option<Pipes>>>,
    server_info: Arc<Mutex<Option<MCPServerInfo>>>,
    connected: AtomicBool,
    request_id: AtomicU64,
}

impl StdioMCPClient {
    pub fn new(
        command: String,
        args: Vec<String>,
        env: HashMap<String, String>,
        cwd: Option<PathBuf>,
    ) -> Self {
        Self {
            command,
            args,
            env,
            cwd,
            child: Arc::new(Mutex::new(None)),
            pipes: Arc::new(Mutex::new(None)),
            server_info: Arc::new(Mutex::new(None)),
            connected: AtomicBool::new(false),
            request_id: AtomicU64::new(0),
        }
    }

    /// Create from a server entry of the tool-server config
    pub fn from_config(config: &MCPServerConfig) -> Self {
        Self::new(
            config.command.clone(),
            config.args.clone(),
            config.env.clone(),
            config.cwd.clone(),
        )
    }

    async fn write_line(pipes: &mut Pipes, message: &Value) -> Result<()> {
        let mut line = serde_json::to_string(message)?;
        line.push('\n');
        pipes
            .stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| MCPError::ConnectionFailed(e.to_string()))?;
        pipes
            .stdin
            .flush()
            .await
            .map_err(|e| MCPError::ConnectionFailed(e.to_string()))
    }

    /// Send a JSON-RPC request and wait for the response carrying its id.
    /// Server notifications and log lines arriving in between are skipped.
    async fn send_request(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst) + 1;
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        });

        let mut guard = self.pipes.lock().await;
        let pipes = guard.as_mut().ok_or(MCPError::NotConnected)?;

        debug!(method, id, "Sending MCP request");
        Self::write_line(pipes, &request).await?;

        loop {
            let mut line = String::new();
            let read = pipes
                .stdout
                .read_line(&mut line)
                .await
                .map_err(|e| MCPError::ConnectionFailed(e.to_string()))?;
            if read == 0 {
                return Err(MCPError::ConnectionFailed(
                    "Server closed connection".to_string(),
                ));
            }

            let Ok(response) = serde_json::from_str::<Value>(line.trim()) else {
                trace!(line = line.trim(), "Skipping non-JSON output from MCP server");
                continue;
            };
            if response.get("id").and_then(Value::as_u64) != Some(id) {
                trace!(method, "Skipping unrelated MCP message");
                continue;
            }

            if let Some(error) = response.get("error") {
                return Err(MCPError::RequestFailed(format!("{method}: {error}")));
            }
            return response
                .get("result")
                .cloned()
                .ok_or_else(|| MCPError::RequestFailed(format!("{method}: no result in response")));
        }
    }

    async fn initialize(&self) -> Result<MCPServerInfo> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "clientInfo": {
                "name": "financial-analyst",
                "version": env!("CARGO_PKG_VERSION")
            }
        });

        let result = self
            .send_request("initialize", params)
            .await
            .map_err(|e| MCPError::InitializationFailed(e.to_string()))?;
        let server_info = MCPServerInfo::from_initialize(&result);

        info!(
            server = %server_info.name,
            version = %server_info.version,
            "Connected to MCP server"
        );

        let notification = json!({
            "jsonrpc": "2.0",
            "method": "notifications/initialized"
        });
        if let Some(pipes) = self.pipes.lock().await.as_mut() {
            Self::write_line(pipes, &notification).await?;
        }

        Ok(server_info)
    }
}

#[async_trait]
impl MCPClient for StdioMCPClient {
    async fn connect(&self) -> Result<()> {
        debug!(command = %self.command, args = ?self.args, "Starting MCP server");

        let mut command = Command::new(&self.command);
        command
            .args(&self.args)
            .envs(&self.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }

        let mut child = command.spawn().map_err(|e| {
            MCPError::ConnectionFailed(format!("Failed to spawn '{}': {e}", self.command))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| MCPError::ConnectionFailed("Failed to get stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MCPError::ConnectionFailed("Failed to get stdout".to_string()))?;

        *self.pipes.lock().await = Some(Pipes {
            stdin,
            stdout: BufReader::new(stdout),
        });
        *self.child.lock().await = Some(child);

        let server_info = self.initialize().await?;
        *self.server_info.lock().await = Some(server_info);
        self.connected.store(true, Ordering::SeqCst);

        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn disconnect(&self) -> Result<()> {
        debug!(command = %self.command, "Disconnecting from MCP server");

        self.connected.store(false, Ordering::SeqCst);
        *self.pipes.lock().await = None;

        let mut child = self.child.lock().await;
        if let Some(child) = child.as_mut() {
            let _ = child.kill().await;
        }
        *child = None;

        Ok(())
    }

    async fn list_tools(&self) -> Result<Vec<MCPToolDefinition>> {
        if !self.is_connected() {
            return Err(MCPError::NotConnected);
        }

        let result = self.send_request("tools/list", json!({})).await?;
        serde_json::from_value(result["tools"].clone())
            .map_err(|e| MCPError::RequestFailed(format!("Failed to parse tools: {e}")))
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<MCPToolResult> {
        if !self.is_connected() {
            return Err(MCPError::NotConnected);
        }

        let params = json!({
            "name": name,
            "arguments": arguments
        });
        let result = self.send_request("tools/call", params).await?;
        serde_json::from_value(result)
            .map_err(|e| MCPError::ToolCallFailed(format!("Failed to parse result: {e}")))
    }

    async fn server_info(&self) -> Option<MCPServerInfo> {
        self.server_info.lock().await.clone()
    }
}
