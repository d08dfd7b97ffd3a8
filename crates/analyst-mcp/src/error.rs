//! Error types for MCP tool servers

use thiserror::Error;

/// Errors raised while talking to MCP tool servers
#[derive(Error, Debug)]
pub enum MCPError {
    /// Could not spawn or reach the server
    #[error("MCP connection failed: {0}")]
    ConnectionFailed(String),

    /// The handshake did not complete
    #[error("MCP initialization failed: {0}")]
    InitializationFailed(String),

    /// Operation attempted before `connect`
    #[error("Not connected to MCP server")]
    NotConnected,

    /// JSON-RPC error or malformed response
    #[error("MCP request failed: {0}")]
    RequestFailed(String),

    /// `tools/call` returned an error result
    #[error("MCP tool call failed: {0}")]
    ToolCallFailed(String),

    /// No server registered under this name
    #[error("MCP server not found: {0}")]
    ServerNotFound(String),

    /// Bad tool-server configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Referenced `${VAR}` is not set
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    /// Tool filter pattern did not compile
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<MCPError> for analyst_core::Error {
    fn from(err: MCPError) -> Self {
        match err {
            MCPError::ConfigError(_)
            | MCPError::EnvVarNotFound(_)
            | MCPError::InvalidPattern(_)
            | MCPError::ServerNotFound(_) => Self::Configuration(err.to_string()),
            MCPError::ConnectionFailed(_) | MCPError::InitializationFailed(_) => {
                Self::InitializationFailed(err.to_string())
            }
            other => Self::ProcessingFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_configuration() {
        let err: analyst_core::Error = MCPError::EnvVarNotFound("NEWS_TOKEN".into()).into();
        assert!(matches!(err, analyst_core::Error::Configuration(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_connection_errors_are_initialization() {
        let err: analyst_core::Error = MCPError::ConnectionFailed("spawn".into()).into();
        assert!(matches!(err, analyst_core::Error::InitializationFailed(_)));
    }
}
