//! Tool-server configuration
//!
//! Loaded from the JSON file named by the analyst config's `mcp_config`.
//! Values may reference environment variables with `${VAR}` or `$VAR`.

use crate::error::MCPError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Root tool-server configuration
///
/// # Example
///
/// ```json
/// {
///   "mcpServers": {
///     "filings": {
///       "command": "sec-filings-mcp",
///       "args": ["--cache", "${HOME}/.cache/filings"]
///     }
///   },
///   "specialists": {
///     "news_analyst": {
///       "mcpServers": ["filings"],
///       "tools": {"allow": ["get_sec_filings"]}
///     }
///   }
/// }
/// ```
///
/// Without a `specialists` section every discovered tool is offered to the
/// specialist whose name patterns it matches, like the built-in tools.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MCPConfig {
    /// Server definitions keyed by server name
    #[serde(default)]
    pub mcp_servers: HashMap<String, MCPServerConfig>,

    /// Per-specialist server assignment, keyed by specialist label
    #[serde(default, alias = "agentConfigurations")]
    pub specialists: HashMap<String, AgentMCPConfig>,
}

/// A server launched as a child process and spoken to over stdio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MCPServerConfig {
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub env: HashMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
}

/// Which servers and tools one specialist receives
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMCPConfig {
    /// Keys into [`MCPConfig::mcp_servers`]
    pub mcp_servers: Vec<String>,

    #[serde(default)]
    pub tools: ToolFilter,
}

/// Allow/deny list; deny wins
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolFilter {
    #[serde(default = "default_allow_all")]
    pub allow: ToolPattern,

    #[serde(default)]
    pub deny: Vec<String>,
}

impl Default for ToolFilter {
    fn default() -> Self {
        Self {
            allow: default_allow_all(),
            deny: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolPattern {
    /// Only `"*"` is meaningful here
    All(String),
    List(Vec<String>),
}

fn default_allow_all() -> ToolPattern {
    ToolPattern::All("*".to_string())
}

impl MCPConfig {
    /// Read, parse and resolve environment references
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MCPError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            MCPError::ConfigError(format!("Failed to read {}: {e}", path.display()))
        })?;

        let mut config: Self = serde_json::from_str(&content).map_err(|e| {
            MCPError::ConfigError(format!("Failed to parse {}: {e}", path.display()))
        })?;

        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    /// Later entries win
    pub fn merge(&mut self, other: Self) {
        self.mcp_servers.extend(other.mcp_servers);
        self.specialists.extend(other.specialists);
    }

    /// Specialist entry, falling back to a `default` entry
    pub fn get_specialist_config(&self, label: &str) -> Option<&AgentMCPConfig> {
        self.specialists
            .get(label)
            .or_else(|| self.specialists.get("default"))
    }

    /// Every specialist entry must name servers that exist
    pub fn validate(&self) -> Result<(), MCPError> {
        for (label, specialist) in &self.specialists {
            if let Some(missing) = specialist
                .mcp_servers
                .iter()
                .find(|name| !self.mcp_servers.contains_key(*name))
            {
                return Err(MCPError::ConfigError(format!(
                    "specialist '{label}' references unknown server '{missing}'"
                )));
            }
        }
        Ok(())
    }

    pub fn resolve_env_vars(&mut self) -> Result<(), MCPError> {
        for server in self.mcp_servers.values_mut() {
            server.command = resolve_env_string(&server.command)?;
            for arg in &mut server.args {
                *arg = resolve_env_string(arg)?;
            }
            for value in server.env.values_mut() {
                *value = resolve_env_string(value)?;
            }
            if let Some(cwd) = &mut server.cwd {
                *cwd = PathBuf::from(resolve_env_string(&cwd.to_string_lossy())?);
            }
        }
        Ok(())
    }
}

/// Expand `${VAR}` and `$VAR` references; an unset variable is an error
pub fn resolve_env_string(s: &str) -> Result<String, MCPError> {
    let braced = regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
        .map_err(|e| MCPError::InvalidPattern(e.to_string()))?;
    let bare = regex::Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)")
        .map_err(|e| MCPError::InvalidPattern(e.to_string()))?;

    let mut result = s.to_string();
    for re in [&braced, &bare] {
        let snapshot = result.clone();
        for cap in re.captures_iter(&snapshot) {
            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| MCPError::EnvVarNotFound(var_name.to_string()))?;
            result = result.replace(&cap[0], &value);
        }
    }
    Ok(result)
}

/// Apply a specialist's allow/deny rules to one tool name
pub fn should_include_tool(tool_name: &str, config: &AgentMCPConfig) -> bool {
    if config.tools.deny.iter().any(|d| d == tool_name) {
        return false;
    }

    match &config.tools.allow {
        ToolPattern::All(pattern) => pattern == "*",
        ToolPattern::List(allowed) => allowed.iter().any(|a| a == tool_name),
    }
}
