//! Scripted provider for tests
//!
//! [`ScriptedProvider`] replays a fixed queue of responses and records every
//! request it receives. When the queue runs dry it fails the call with
//! [`LLMError::RequestFailed`], which callers see as an unavailable backend.

use crate::{
    CompletionRequest, CompletionResponse, ContentBlock, LLMError, LLMProvider, Message, Result,
    StopReason, TokenUsage,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One scripted reply
#[derive(Debug)]
pub enum ScriptedReply {
    /// Plain assistant text
    Text(String),
    /// Assistant message requesting one tool call
    ToolCall {
        name: String,
        input: serde_json::Value,
    },
    /// Transport failure
    Fail(String),
}

impl ScriptedReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn tool_call(name: impl Into<String>, input: serde_json::Value) -> Self {
        Self::ToolCall {
            name: name.into(),
            input,
        }
    }
}

/// Provider that replays scripted replies in order
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<CompletionRequest>>,
    calls: Mutex<usize>,
}

impl ScriptedProvider {
    pub fn new(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
            calls: Mutex::new(0),
        }
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Replies not yet consumed
    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|r| r.len()).unwrap_or_default()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let call = {
            let mut calls = self
                .calls
                .lock()
                .map_err(|e| LLMError::RequestFailed(e.to_string()))?;
            *calls += 1;
            *calls
        };
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        let reply = self
            .replies
            .lock()
            .map_err(|e| LLMError::RequestFailed(e.to_string()))?
            .pop_front()
            .ok_or_else(|| LLMError::RequestFailed("script exhausted".to_string()))?;

        let usage = TokenUsage {
            input_tokens: 10,
            output_tokens: 5,
        };
        match reply {
            ScriptedReply::Text(text) => Ok(CompletionResponse {
                message: Message::assistant(text),
                stop_reason: StopReason::EndTurn,
                usage,
            }),
            ScriptedReply::ToolCall { name, input } => Ok(CompletionResponse {
                message: Message::tool_calls(vec![ContentBlock::ToolUse {
                    id: format!("call_{call}"),
                    name,
                    input,
                }]),
                stop_reason: StopReason::ToolUse,
                usage,
            }),
            ScriptedReply::Fail(reason) => Err(LLMError::RequestFailed(reason)),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
