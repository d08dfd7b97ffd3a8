//! OpenAI-compatible chat completions provider
//!
//! Talks to any server implementing `POST {api_base}/chat/completions`:
//! OpenAI itself, Ollama (`http://localhost:11434/v1`), LM Studio, vLLM.
//!
//! # Example
//!
//! ```no_run
//! use analyst_llm::{CompletionRequest, LLMProvider, Message};
//! use analyst_llm::providers::{OpenAIConfig, OpenAIProvider};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = OpenAIProvider::with_config(OpenAIConfig::ollama())?;
//!
//! let request = CompletionRequest::builder("granite4:3b")
//!     .message(Message::user("What's the current price of Apple?"))
//!     .temperature(0.0)
//!     .build();
//!
//! let response = provider.complete(request).await?;
//! println!("{}", response.message.text().unwrap_or_default());
//! # Ok(())
//! # }
//! ```

use crate::{
    CompletionRequest, CompletionResponse, ContentBlock, LLMError, LLMProvider, Message,
    MessageContent, Result, Role, StopReason, TokenUsage, ToolDefinition,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const OLLAMA_API_BASE: &str = "http://localhost:11434/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for the OpenAI-compatible provider
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API key sent as a bearer token (local servers accept any value)
    pub api_key: String,

    /// Base URL, e.g. `https://api.openai.com/v1` or `http://localhost:11434/v1`
    pub api_base: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// When set, requests for any other model are rejected before sending
    pub supported_models: Option<Vec<String>>,
}

impl OpenAIConfig {
    /// Create a config for the hosted OpenAI API
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Config for a local Ollama server
    pub fn ollama() -> Self {
        Self {
            api_key: "ollama".to_string(),
            api_base: OLLAMA_API_BASE.to_string(),
            timeout_secs: 180,
            supported_models: None,
        }
    }

    /// Create config from `OPENAI_API_KEY` and optional `OPENAI_API_BASE`
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            LLMError::ConfigurationError("OPENAI_API_KEY environment variable not set".to_string())
        })?;

        let api_base = std::env::var("OPENAI_API_BASE")
            .unwrap_or_else(|_| DEFAULT_OPENAI_API_BASE.to_string());

        Ok(Self {
            api_key,
            api_base,
            ..Self::default()
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Set request timeout in seconds
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_supported_models(mut self, models: Vec<String>) -> Self {
        self.supported_models = Some(models);
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: DEFAULT_OPENAI_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            supported_models: None,
        }
    }
}

/// Provider for OpenAI-compatible chat completion servers
pub struct OpenAIProvider {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIProvider {
    /// Create a provider with custom configuration
    pub fn with_config(config: OpenAIConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Create a provider for the hosted API with default settings
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(OpenAIConfig::new(api_key))
    }

    /// Create a provider from environment variables
    pub fn from_env() -> Result<Self> {
        Self::with_config(OpenAIConfig::from_env()?)
    }

    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    fn validate_model(&self, model: &str) -> Result<()> {
        if let Some(supported) = &self.config.supported_models {
            if !supported.iter().any(|m| m == model) {
                return Err(LLMError::InvalidRequest(format!(
                    "Model '{model}' is not in the supported models list: {supported:?}"
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    #[instrument(skip(self, request), fields(model = %request.model, api_base = %self.config.api_base))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.validate_model(&request.model)?;

        let openai_request = OpenAIRequest {
            model: request.model.clone(),
            messages: build_openai_messages(request.system, request.messages),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            tools: request.tools.as_deref().map(convert_tools),
        };

        debug!(
            messages = openai_request.messages.len(),
            tools = openai_request.tools.as_ref().map_or(0, Vec::len),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(self.config.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&openai_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;

            return Err(match status.as_u16() {
                401 => LLMError::AuthenticationFailed,
                429 => LLMError::RateLimitExceeded(error_text),
                400 => LLMError::InvalidRequest(error_text),
                404 => LLMError::ModelNotFound(request.model),
                _ => LLMError::RequestFailed(format!("HTTP {status}: {error_text}")),
            });
        }

        let openai_response: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| LLMError::UnexpectedResponse(format!("Failed to parse response: {e}")))?;

        let choice = openai_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::UnexpectedResponse("No choices in response".to_string()))?;

        let usage = openai_response.usage.unwrap_or_default();
        let finish_reason = choice.finish_reason.unwrap_or_default();
        debug!(
            stop_reason = %finish_reason,
            input_tokens = usage.prompt_tokens,
            output_tokens = usage.completion_tokens,
            "Received chat completion"
        );

        let message = parse_openai_response(choice.message)?;
        let stop_reason = if message.has_tool_uses() {
            StopReason::ToolUse
        } else {
            map_stop_reason(&finish_reason)
        };

        Ok(CompletionResponse {
            message,
            stop_reason,
            usage: TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            },
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool>>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl OpenAIMessage {
    fn text(role: &'static str, content: String, name: Option<String>) -> Self {
        Self {
            role,
            content: Some(content),
            tool_calls: None,
            tool_call_id: None,
            name,
        }
    }
}

#[derive(Debug, Serialize)]
struct OpenAITool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: OpenAIFunction,
}

#[derive(Debug, Serialize)]
struct OpenAIFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct OpenAIToolCall {
    id: String,
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: OpenAIFunctionCall,
}

#[derive(Debug, Serialize)]
struct OpenAIFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<OpenAIResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseToolCall {
    #[serde(default)]
    id: Option<String>,
    function: OpenAIResponseFunctionCall,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseFunctionCall {
    name: String,
    /// Usually a JSON string; some local servers send the object directly
    arguments: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAIUsage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
}

// ============================================================================
// Conversion functions
// ============================================================================

/// System prompt first, then the conversation in order
fn build_openai_messages(system: Option<String>, messages: Vec<Message>) -> Vec<OpenAIMessage> {
    let mut result = Vec::with_capacity(messages.len() + 1);

    if let Some(sys) = system {
        result.push(OpenAIMessage::text("system", sys, None));
    }

    for msg in messages {
        result.extend(convert_message(msg));
    }

    result
}

/// Convert one message; a tool message with several results expands into
/// several `tool` messages
fn convert_message(msg: Message) -> Vec<OpenAIMessage> {
    let role = match msg.role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
        Role::Tool => "tool",
    };

    match msg.content {
        Some(MessageContent::Text(text)) => vec![OpenAIMessage::text(role, text, msg.name)],
        Some(MessageContent::Blocks(blocks)) => convert_blocks(role, blocks, msg.name),
        None => vec![OpenAIMessage::text(role, String::new(), msg.name)],
    }
}

fn convert_blocks(role: &'static str, blocks: Vec<ContentBlock>, name: Option<String>) -> Vec<OpenAIMessage> {
    let mut messages = Vec::new();
    let mut text_parts = Vec::new();
    let mut tool_calls = Vec::new();

    for block in blocks {
        match block {
            ContentBlock::Text { text } => text_parts.push(text),
            ContentBlock::ToolUse { id, name, input } => {
                tool_calls.push(OpenAIToolCall {
                    id,
                    tool_type: "function",
                    function: OpenAIFunctionCall {
                        name,
                        arguments: input.to_string(),
                    },
                });
            }
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                ..
            } => {
                messages.push(OpenAIMessage {
                    role: "tool",
                    content: Some(content),
                    tool_calls: None,
                    tool_call_id: Some(tool_use_id),
                    name: None,
                });
            }
        }
    }

    if !text_parts.is_empty() || !tool_calls.is_empty() {
        let content = if text_parts.is_empty() {
            None
        } else {
            Some(text_parts.join("\n"))
        };

        messages.insert(
            0,
            OpenAIMessage {
                role,
                content,
                tool_calls: if tool_calls.is_empty() {
                    None
                } else {
                    Some(tool_calls)
                },
                tool_call_id: None,
                name,
            },
        );
    }

    messages
}

fn convert_tools(tools: &[ToolDefinition]) -> Vec<OpenAITool> {
    tools
        .iter()
        .map(|tool| OpenAITool {
            tool_type: "function",
            function: OpenAIFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.input_schema.clone(),
            },
        })
        .collect()
}

/// Parse the response message; tool call ids are synthesized when the server
/// omits them. Unparseable arguments are kept verbatim for the executor to
/// reject as a tool error.
fn parse_openai_response(msg: OpenAIResponseMessage) -> Result<Message> {
    let mut blocks = Vec::new();

    if let Some(content) = msg.content {
        if !content.is_empty() {
            blocks.push(ContentBlock::Text { text: content });
        }
    }

    for (index, call) in msg.tool_calls.unwrap_or_default().into_iter().enumerate() {
        let input = match call.function.arguments {
            serde_json::Value::String(raw) if raw.trim().is_empty() => serde_json::json!({}),
            serde_json::Value::String(raw) => match serde_json::from_str(&raw) {
                Ok(input) => input,
                Err(e) => {
                    warn!(tool = %call.function.name, error = %e, "Tool arguments are not valid JSON");
                    crate::tools::malformed_arguments(raw)
                }
            },
            other => other,
        };

        blocks.push(ContentBlock::ToolUse {
            id: call.id.unwrap_or_else(|| format!("call_{index}")),
            name: call.function.name,
            input,
        });
    }

    if blocks.is_empty() {
        blocks.push(ContentBlock::Text {
            text: String::new(),
        });
    }

    Ok(Message {
        role: Role::Assistant,
        content: Some(MessageContent::Blocks(blocks)),
        name: None,
    })
}

fn map_stop_reason(reason: &str) -> StopReason {
    match reason {
        "stop" => StopReason::EndTurn,
        "length" => StopReason::MaxTokens,
        "tool_calls" => StopReason::ToolUse,
        other => {
            debug!("Unmapped stop reason: {other}");
            StopReason::EndTurn
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ollama_preset() {
        let provider = OpenAIProvider::with_config(OpenAIConfig::ollama()).unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.config().api_base, "http://localhost:11434/v1");
        assert_eq!(
            provider.config().completions_url(),
            "http://localhost:11434/v1/chat/completions"
        );
    }

    #[test]
    fn test_trailing_slash_in_base() {
        let config = OpenAIConfig::ollama().with_api_base("http://gpu-box:11434/v1/");
        assert_eq!(config.completions_url(), "http://gpu-box:11434/v1/chat/completions");
    }

    #[test]
    fn test_model_validation() {
        let config = OpenAIConfig::ollama().with_supported_models(vec!["granite4:3b".to_string()]);
        let provider = OpenAIProvider::with_config(config).unwrap();

        assert!(provider.validate_model("granite4:3b").is_ok());
        assert!(matches!(
            provider.validate_model("llama3"),
            Err(LLMError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_system_prompt_comes_first() {
        let messages = build_openai_messages(
            Some("You are a Data Analyst.".to_string()),
            vec![Message::user("Price of AAPL?")],
        );

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content.as_deref(), Some("You are a Data Analyst."));
        assert_eq!(messages[1].role, "user");
    }

    #[test]
    fn test_agent_name_is_forwarded() {
        let msgs = convert_message(Message::assistant("Routing to data_analyst").with_name("supervisor"));
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].name.as_deref(), Some("supervisor"));
    }

    #[test]
    fn test_tool_call_and_results() {
        let call = Message::tool_calls(vec![
            ContentBlock::ToolUse {
                id: "call_1".to_string(),
                name: "get_stock_price".to_string(),
                input: json!({"ticker": "AAPL"}),
            },
            ContentBlock::ToolUse {
                id: "call_2".to_string(),
                name: "get_stock_info".to_string(),
                input: json!({"ticker": "AAPL"}),
            },
        ]);
        let converted = convert_message(call);
        assert_eq!(converted.len(), 1);
        let calls = converted[0].tool_calls.as_ref().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].function.arguments, r#"{"ticker":"AAPL"}"#);
        assert!(converted[0].content.is_none());

        let results = Message {
            role: Role::Tool,
            content: Some(MessageContent::Blocks(vec![
                ContentBlock::ToolResult {
                    tool_use_id: "call_1".to_string(),
                    content: "{}".to_string(),
                    is_error: None,
                },
                ContentBlock::ToolResult {
                    tool_use_id: "call_2".to_string(),
                    content: "not found".to_string(),
                    is_error: Some(true),
                },
            ])),
            name: None,
        };
        let converted = convert_message(results);
        assert_eq!(converted.len(), 2);
        assert!(converted.iter().all(|m| m.role == "tool"));
        assert_eq!(converted[1].tool_call_id.as_deref(), Some("call_2"));
    }

    #[test]
    fn test_tool_definition_conversion() {
        let tool = ToolDefinition::new("get_stock_news", "Recent news", json!({"type": "object"}));
        let converted = convert_tools(&[tool]);
        assert_eq!(converted[0].tool_type, "function");
        assert_eq!(converted[0].function.name, "get_stock_news");
    }

    #[test]
    fn test_parse_response_with_string_arguments() {
        let raw = json!({
            "content": "",
            "tool_calls": [{
                "id": "call_9",
                "type": "function",
                "function": {"name": "create_chart", "arguments": "{\"ticker\":\"TSLA\",\"period\":\"6mo\"}"}
            }]
        });
        let msg: OpenAIResponseMessage = serde_json::from_value(raw).unwrap();
        let message = parse_openai_response(msg).unwrap();

        let uses = message.tool_uses();
        assert_eq!(uses.len(), 1);
        match uses[0] {
            ContentBlock::ToolUse { id, name, input } => {
                assert_eq!(id, "call_9");
                assert_eq!(name, "create_chart");
                assert_eq!(input["period"], "6mo");
            }
            other => panic!("Expected tool use, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_response_with_object_arguments_and_no_id() {
        let raw = json!({
            "tool_calls": [{
                "function": {"name": "get_stock_news", "arguments": {"ticker": "NVDA"}}
            }]
        });
        let msg: OpenAIResponseMessage = serde_json::from_value(raw).unwrap();
        let message = parse_openai_response(msg).unwrap();
        match message.tool_uses()[0] {
            ContentBlock::ToolUse { id, input, .. } => {
                assert_eq!(id, "call_0");
                assert_eq!(input["ticker"], "NVDA");
            }
            other => panic!("Expected tool use, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_response_with_broken_arguments() {
        let raw = json!({
            "tool_calls": [{
                "id": "call_3",
                "function": {"name": "get_stock_price", "arguments": "{\"ticker\": \"AAPL\""}
            }]
        });
        let msg: OpenAIResponseMessage = serde_json::from_value(raw).unwrap();
        let message = parse_openai_response(msg).unwrap();
        match message.tool_uses()[0] {
            ContentBlock::ToolUse { name, input, .. } => {
                assert_eq!(name, "get_stock_price");
                assert_eq!(crate::tools::raw_arguments(input), Some("{\"ticker\": \"AAPL\""));
            }
            other => panic!("Expected tool use, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_plain_text_response() {
        let raw = json!({"content": "data_analyst"});
        let msg: OpenAIResponseMessage = serde_json::from_value(raw).unwrap();
        let message = parse_openai_response(msg).unwrap();
        assert_eq!(message.text(), Some("data_analyst"));
        assert!(!message.has_tool_uses());
    }

    #[test]
    fn test_response_without_usage() {
        let raw = json!({"choices": [{"message": {"content": "finish"}}]});
        let response: OpenAIResponse = serde_json::from_value(raw).unwrap();
        assert!(response.usage.is_none());
        assert!(response.choices[0].finish_reason.is_none());
    }

    #[test]
    fn test_stop_reason_mapping() {
        assert_eq!(map_stop_reason("stop"), StopReason::EndTurn);
        assert_eq!(map_stop_reason("length"), StopReason::MaxTokens);
        assert_eq!(map_stop_reason("tool_calls"), StopReason::ToolUse);
        assert_eq!(map_stop_reason(""), StopReason::EndTurn);
    }
}
