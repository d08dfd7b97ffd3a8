//! Scripted agent wrapper for tests
//!
//! [`ScriptedAgent`] plays back one [`ScriptedTurn`] per invocation. Tool
//! calls in a turn are executed against the real tool subset handed to the
//! specialist, so tests observe actual tool results and contained errors.

use crate::wrapper::{AgentOutcome, AgentTask, AgentWrapper};
use analyst_core::{Error, Result};
use analyst_llm::{ContentBlock, Message};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub enum ScriptedTurn {
    /// Answer immediately
    Answer(String),
    /// Call tools in order, then answer
    Tools {
        calls: Vec<(String, Value)>,
        answer: String,
    },
    /// Backend failure
    Fail(String),
}

impl ScriptedTurn {
    pub fn answer(text: impl Into<String>) -> Self {
        Self::Answer(text.into())
    }

    pub fn tool(name: impl Into<String>, input: Value, answer: impl Into<String>) -> Self {
        Self::Tools {
            calls: vec![(name.into(), input)],
            answer: answer.into(),
        }
    }
}

/// Records which specialists were invoked and which tools each was offered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedInvocation {
    pub label: String,
    pub tool_names: Vec<String>,
    pub history_len: usize,
}

#[derive(Debug, Default)]
pub struct ScriptedAgent {
    turns: Mutex<VecDeque<ScriptedTurn>>,
    invocations: Mutex<Vec<RecordedInvocation>>,
}

impl ScriptedAgent {
    pub fn new(turns: impl IntoIterator<Item = ScriptedTurn>) -> Self {
        Self {
            turns: Mutex::new(turns.into_iter().collect()),
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn invocations(&self) -> Vec<RecordedInvocation> {
        self.invocations
            .lock()
            .map(|i| i.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AgentWrapper for ScriptedAgent {
    async fn invoke(&self, task: AgentTask<'_>) -> Result<AgentOutcome> {
        if let Ok(mut invocations) = self.invocations.lock() {
            invocations.push(RecordedInvocation {
                label: task.label.to_string(),
                tool_names: task.tools.names().into_iter().map(String::from).collect(),
                history_len: task.history.len(),
            });
        }

        let turn = self
            .turns
            .lock()
            .map_err(|e| Error::BackendUnavailable(e.to_string()))?
            .pop_front()
            .ok_or_else(|| Error::BackendUnavailable("script exhausted".to_string()))?;

        let (calls, answer) = match turn {
            ScriptedTurn::Answer(answer) => (Vec::new(), answer),
            ScriptedTurn::Tools { calls, answer } => (calls, answer),
            ScriptedTurn::Fail(reason) => return Err(Error::BackendUnavailable(reason)),
        };

        let mut outcome = AgentOutcome::default();
        for (index, (name, input)) in calls.into_iter().enumerate() {
            let id = format!("{}_{index}", task.label);
            let result = match task.tools.get(&name) {
                Some(tool) => tool.execute(input.clone()).await,
                None => Err(Error::tool(&name, "unknown tool")),
            };
            outcome.messages.push(
                Message::tool_calls(vec![ContentBlock::ToolUse {
                    id: id.clone(),
                    name,
                    input,
                }])
                .with_name(task.label),
            );
            let reply = match result {
                Ok(value) => Message::tool_result(id, value.to_string()),
                Err(e) => Message::tool_error(id, format!("Error: {e}")),
            };
            outcome.messages.push(reply.with_name(task.label));
            outcome.iterations += 1;
        }

        outcome.iterations += 1;
        outcome
            .messages
            .push(Message::assistant(answer).with_name(task.label));
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyst_tools::ToolRegistry;
    use serde_json::json;

    #[tokio::test]
    async fn test_unknown_tool_is_contained_and_exhaustion_fails() {
        let agent = ScriptedAgent::new([ScriptedTurn::tool(
            "create_chart",
            json!({"ticker": "TSLA"}),
            "Chart saved successfully",
        )]);
        let history = vec![Message::user("Show me a 6-month chart for TSLA")];
        let tools = ToolRegistry::new();
        let task = AgentTask {
            label: "chart_specialist",
            system_prompt: "",
            history: &history,
            tools: &tools,
        };

        let outcome = agent.invoke(task).await.unwrap();
        assert_eq!(outcome.messages.len(), 3);
        assert!(outcome.messages[1].is_tool_error());
        assert_eq!(
            outcome.final_message().and_then(Message::name),
            Some("chart_specialist")
        );

        assert!(matches!(
            agent.invoke(task).await,
            Err(Error::BackendUnavailable(_))
        ));
        assert_eq!(agent.invocations().len(), 2);
    }
}
