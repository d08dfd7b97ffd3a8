//! ReAct executor for a single specialist turn
//!
//! The loop:
//! 1. Call the model with the shared history, the role prompt and the
//!    specialist's tools
//! 2. If it asked for tools, run them, append the results and go again
//! 3. Otherwise the reply is the specialist's final answer
//!
//! Tool failures are fed back to the model as error results. Only backend
//! failures escape as `Err`.

use crate::wrapper::{AgentOutcome, AgentTask, AgentWrapper};
use analyst_core::Result;
use analyst_llm::tools::raw_arguments;
use analyst_llm::{
    CompletionRequest, ContentBlock, LLMProvider, Message, StopReason, ToolDefinition,
};
use analyst_tools::ToolRegistry;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Callbacks for tool activity, e.g. to echo progress in the CLI
#[async_trait]
pub trait ExecutorEventHandler: Send + Sync {
    async fn on_tool_start(&self, _agent: &str, _tool: &str, _input: &Value) {}

    async fn on_tool_done(
        &self,
        _agent: &str,
        _tool: &str,
        _result: std::result::Result<&Value, &str>,
        _duration_ms: u64,
    ) {
    }
}

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Model calls allowed per specialist turn
    pub max_iterations: usize,
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 8,
            model: "granite4:3b".to_string(),
            max_tokens: 2048,
            temperature: 0.1,
        }
    }
}

/// Production [`AgentWrapper`]: a tool-calling loop over an [`LLMProvider`]
pub struct AgentExecutor {
    provider: Arc<dyn LLMProvider>,
    config: ExecutorConfig,
    event_handler: Option<Arc<dyn ExecutorEventHandler>>,
}

impl AgentExecutor {
    pub fn new(provider: Arc<dyn LLMProvider>, config: ExecutorConfig) -> Self {
        Self {
            provider,
            config,
            event_handler: None,
        }
    }

    #[must_use]
    pub fn with_event_handler(mut self, handler: Arc<dyn ExecutorEventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    fn build_tool_definitions(tools: &ToolRegistry) -> Vec<ToolDefinition> {
        tools
            .list_tools()
            .iter()
            .map(|tool| ToolDefinition::new(tool.name(), tool.description(), tool.input_schema()))
            .collect()
    }

    /// Run every tool call in `message`, returning one result message per call
    async fn execute_tools(&self, label: &str, message: &Message, tools: &ToolRegistry) -> Vec<Message> {
        let mut results = Vec::new();

        for tool_use in message.tool_uses() {
            let ContentBlock::ToolUse { id, name, input } = tool_use else {
                continue;
            };

            let input_preview: String = input.to_string().chars().take(300).collect();
            info!(agent = label, tool = %name, tool_id = %id, input = %input_preview, "Executing tool");

            if let Some(handler) = &self.event_handler {
                handler.on_tool_start(label, name, input).await;
            }

            let start = Instant::now();
            let outcome = match (raw_arguments(input), tools.get(name)) {
                (Some(raw), _) => Err(analyst_core::Error::tool(
                    name,
                    format!("invalid JSON arguments: {raw}"),
                )),
                (None, Some(tool)) => tool.execute(input.clone()).await,
                (None, None) => Err(analyst_core::Error::tool(
                    name,
                    format!("unknown tool; available: {}", tools.names().join(", ")),
                )),
            };
            let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

            match outcome {
                Ok(result) => {
                    let result_str = result.to_string();
                    info!(
                        agent = label,
                        tool = %name,
                        duration_ms,
                        result_length = result_str.len(),
                        "Tool execution succeeded"
                    );
                    if let Some(handler) = &self.event_handler {
                        handler.on_tool_done(label, name, Ok(&result), duration_ms).await;
                    }
                    results.push(Message::tool_result(id.clone(), result_str).with_name(label));
                }
                Err(e) => {
                    warn!(agent = label, tool = %name, duration_ms, error = %e, "Tool execution failed");
                    let error_str = format!("Error: {e}");
                    if let Some(handler) = &self.event_handler {
                        handler.on_tool_done(label, name, Err(&error_str), duration_ms).await;
                    }
                    results.push(Message::tool_error(id.clone(), error_str).with_name(label));
                }
            }
        }

        results
    }
}

#[async_trait]
impl AgentWrapper for AgentExecutor {
    async fn invoke(&self, task: AgentTask<'_>) -> Result<AgentOutcome> {
        let label = task.label;
        let definitions = Self::build_tool_definitions(task.tools);
        let mut outcome = AgentOutcome::default();

        while outcome.iterations < self.config.max_iterations {
            outcome.iterations += 1;
            info!(
                agent = label,
                iteration = outcome.iterations,
                max_iterations = self.config.max_iterations,
                tool_count = definitions.len(),
                "Specialist iteration started"
            );

            let mut conversation = task.history.to_vec();
            conversation.extend(outcome.messages.iter().cloned());

            let request = CompletionRequest::builder(&self.config.model)
                .messages(conversation)
                .system(task.system_prompt)
                .max_tokens(self.config.max_tokens)
                .temperature(self.config.temperature)
                .tools(definitions.clone())
                .build();

            let response = self.provider.complete(request).await?;
            outcome.usage.accumulate(response.usage);

            debug!(
                agent = label,
                stop_reason = ?response.stop_reason,
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                "Model response received"
            );

            if response.message.has_tool_uses() {
                let results = self.execute_tools(label, &response.message, task.tools).await;
                outcome.messages.push(response.message.with_name(label));
                outcome.messages.extend(results);
                continue;
            }

            let text = match (response.message.text(), response.stop_reason) {
                (Some(text), _) if !text.is_empty() => text.to_string(),
                (_, StopReason::MaxTokens) => "Response truncated due to token limit".to_string(),
                _ => String::new(),
            };
            info!(agent = label, iterations = outcome.iterations, response_length = text.len(), "Specialist finished");
            outcome.messages.push(Message::assistant(text).with_name(label));
            return Ok(outcome);
        }

        warn!(agent = label, max_iterations = self.config.max_iterations, "Iteration limit reached");
        outcome.messages.push(
            Message::assistant(format!(
                "Stopped after {} steps without a final answer.",
                self.config.max_iterations
            ))
            .with_name(label),
        );
        Ok(outcome)
    }
}

pub struct AgentExecutorBuilder {
    provider: Option<Arc<dyn LLMProvider>>,
    config: ExecutorConfig,
    event_handler: Option<Arc<dyn ExecutorEventHandler>>,
}

impl AgentExecutorBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            config: ExecutorConfig::default(),
            event_handler: None,
        }
    }

    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    #[must_use]
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    #[must_use]
    pub fn event_handler(mut self, handler: Arc<dyn ExecutorEventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    pub fn build(self) -> Result<AgentExecutor> {
        let provider = self.provider.ok_or_else(|| {
            analyst_core::Error::InitializationFailed("Provider not set".to_string())
        })?;

        let mut executor = AgentExecutor::new(provider, self.config);
        executor.event_handler = self.event_handler;
        Ok(executor)
    }
}

impl Default for AgentExecutorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
