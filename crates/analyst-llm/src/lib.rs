//! LLM provider abstraction for the financial analyst
//!
//! This crate provides:
//!
//! - Message types carrying agent attribution
//! - Completion request/response types
//! - Tool definitions for function calling
//! - The [`LLMProvider`] trait and an OpenAI-compatible implementation
//!   (works against Ollama's `/v1` endpoint)

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;
pub mod tools;

#[cfg(feature = "openai")]
pub mod providers;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use completion::{CompletionRequest, CompletionResponse, StopReason, TokenUsage};
pub use error::{LLMError, Result};
pub use messages::{ContentBlock, Message, MessageContent, Role};
pub use provider::LLMProvider;
#[cfg(any(test, feature = "testing"))]
pub use provider::MockLLMProvider;
pub use tools::ToolDefinition;
