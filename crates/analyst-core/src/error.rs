//! Error taxonomy shared by every crate in the workspace
//!
//! Errors fall into two groups. Fatal errors abort the current workflow run
//! (or startup) and reach the user. [`Error::ToolInvocation`] is contained:
//! the agent loop converts it into a tool-error result and the model decides
//! what to do next.

use thiserror::Error;

/// Result type alias for analyst-core
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for analyst operations
#[derive(Error, Debug)]
pub enum Error {
    /// The completion backend could not be reached or failed to answer
    #[error("Completion backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A single tool call failed
    #[error("Tool '{tool}' failed: {message}")]
    ToolInvocation { tool: String, message: String },

    /// Missing or invalid setup detected at startup
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Component initialization failed
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// Processing failed
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

impl Error {
    /// Build a tool invocation error
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolInvocation {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Whether this error must abort the whole workflow run
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::ToolInvocation { .. })
    }
}
