//! The seam between the workflow and whatever runs a specialist
//!
//! The workflow hands an [`AgentWrapper`] the shared history, the
//! specialist's tools and its role prompt; the wrapper returns only what the
//! specialist added. Production uses [`crate::AgentExecutor`]; tests use a
//! scripted wrapper.

use analyst_core::Result;
use analyst_llm::{Message, TokenUsage};
use analyst_tools::ToolRegistry;
use async_trait::async_trait;

/// One specialist invocation
#[derive(Clone, Copy)]
pub struct AgentTask<'a> {
    /// Specialist label; every assistant message in the outcome carries it
    pub label: &'a str,
    pub system_prompt: &'a str,
    /// Full workflow history, oldest first
    pub history: &'a [Message],
    pub tools: &'a ToolRegistry,
}

/// What a specialist appended to the conversation
#[derive(Debug, Clone, Default)]
pub struct AgentOutcome {
    /// Tool-call / tool-result pairs followed by exactly one final answer
    pub messages: Vec<Message>,
    pub usage: TokenUsage,
    /// Model calls made
    pub iterations: usize,
}

impl AgentOutcome {
    /// The specialist's final answer
    pub fn final_message(&self) -> Option<&Message> {
        self.messages.last().filter(|m| m.is_final_answer())
    }

    /// Tool-result messages in call order
    pub fn tool_results(&self) -> impl Iterator<Item = &Message> {
        self.messages
            .iter()
            .filter(|m| m.role == analyst_llm::Role::Tool)
    }
}

/// Runs a specialist against the shared conversation
///
/// Tool failures must come back as tool-error messages inside the outcome.
/// An `Err` means the backend itself failed and aborts the run.
#[async_trait]
pub trait AgentWrapper: Send + Sync {
    async fn invoke(&self, task: AgentTask<'_>) -> Result<AgentOutcome>;
}
