//! OpenAI-compatible provider implementation
//!
//! Implements [`LLMProvider`] against any endpoint that speaks the OpenAI chat
//! completions protocol. The default base URL points at Groq.
//! See: https://console.groq.com/docs/api-reference#chat
//!
//! # Example
//!
//! ```rust,ignore
//! use tadawul_llm::{CompletionRequest, LLMProvider, Message};
//! use tadawul_llm::providers::{OpenAIConfig, OpenAIProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = OpenAIConfig::new("gsk_...").with_timeout(60);
//!     let provider = OpenAIProvider::with_config(config)?;
//!
//!     let request = CompletionRequest::builder("llama-3.3-70b-versatile")
//!         .add_message(Message::user("What is the Tadawul?"))
//!         .build();
//!
//!     let response = provider.complete(request).await?;
//!     println!("{}", response.message.text().unwrap_or_default());
//!     Ok(())
//! }
//! ```

use crate::{
    CompletionRequest, CompletionResponse, ContentBlock, LLMProvider, Message, MessageContent,
    Result, Role, StopReason, TokenUsage, ToolDefinition,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Groq's OpenAI-compatible endpoint
pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for the OpenAI-compatible provider
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API key sent as a bearer token
    pub api_key: String,

    /// Base URL of the chat completions API (default: Groq)
    pub api_base: String,

    /// Request timeout in seconds (default: 120)
    pub timeout_secs: u64,
}

impl OpenAIConfig {
    /// Create a new config with the given API key and default settings
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set custom API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Set request timeout in seconds
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self::new(String::new())
    }
}

/// OpenAI-compatible chat completions provider
pub struct OpenAIProvider {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIProvider {
    /// Create a provider with custom configuration
    pub fn with_config(config: OpenAIConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(crate::LLMError::ConfigurationError(
                "API key must not be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Create a provider with API key and default settings
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(OpenAIConfig::new(api_key))
    }

    /// Get the current configuration
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    #[instrument(skip(self, request), fields(model = %request.model, api_base = %self.config.api_base))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let model = request.model.clone();
        let wire_request = build_request(request);
        debug!(
            messages = wire_request.messages.len(),
            tools = wire_request.tools.as_ref().map_or(0, Vec::len),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.api_base))
            .bearer_auth(&self.config.api_key)
            .json(&wire_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;

            return Err(match status.as_u16() {
                401 => crate::LLMError::AuthenticationFailed,
                429 => crate::LLMError::RateLimitExceeded(error_text),
                400 => crate::LLMError::InvalidRequest(error_text),
                404 => crate::LLMError::ModelNotFound(model),
                _ => crate::LLMError::RequestFailed(format!("HTTP {status}: {error_text}")),
            });
        }

        let wire_response: OpenAIResponse = response.json().await.map_err(|e| {
            crate::LLMError::UnexpectedResponse(format!("Failed to parse response: {e}"))
        })?;

        // Only the first choice is ever requested
        let choice = wire_response.choices.into_iter().next().ok_or_else(|| {
            crate::LLMError::UnexpectedResponse("No choices in response".to_string())
        })?;

        let usage = wire_response.usage.unwrap_or_default();
        debug!(
            finish_reason = %choice.finish_reason,
            input_tokens = usage.prompt_tokens,
            output_tokens = usage.completion_tokens,
            "Received chat completion"
        );

        Ok(CompletionResponse {
            message: parse_response_message(choice.message),
            stop_reason: map_stop_reason(&choice.finish_reason),
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
// Wire request types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    max_completion_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: &'static str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIToolCall>>,
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
    arguments: serde_json::Value,
}

// ============================================================================
// Wire response types
// ============================================================================

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
    finish_reason: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAIResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseToolCall {
    id: String,
    function: OpenAIResponseFunctionCall,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseFunctionCall {
    name: String,
    // Kept as received: a JSON string that encodes the argument object.
    arguments: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
}

// ============================================================================
// Conversion functions
// ============================================================================

fn build_request(request: CompletionRequest) -> OpenAIRequest {
    OpenAIRequest {
        model: request.model,
        messages: build_messages(request.system, request.messages),
        max_completion_tokens: request.max_tokens,
        temperature: request.temperature,
        top_p: request.top_p,
        stream: false,
        stop: request.stop_sequences,
        tools: request.tools.as_deref().map(convert_tools),
        tool_choice: request.tool_choice,
    }
}

/// System prompt goes first, followed by the conversation in order
fn build_messages(system: Option<String>, messages: Vec<Message>) -> Vec<OpenAIMessage> {
    let mut result = Vec::with_capacity(messages.len() + 1);

    if let Some(sys) = system {
        result.push(OpenAIMessage {
            role: Role::System.as_str(),
            content: sys,
            tool_calls: None,
        });
    }

    result.extend(messages.into_iter().map(convert_message));
    result
}

fn convert_message(msg: Message) -> OpenAIMessage {
    let role = msg.role.as_str();

    match msg.content {
        Some(MessageContent::Text(text)) => OpenAIMessage {
            role,
            content: text,
            tool_calls: None,
        },
        Some(MessageContent::Blocks(blocks)) => {
            let mut content = String::new();
            let mut tool_calls = Vec::new();
            for block in blocks {
                match block {
                    ContentBlock::Text { text } => content.push_str(&text),
                    ContentBlock::ToolUse { id, name, input } => tool_calls.push(OpenAIToolCall {
                        id,
                        tool_type: "function",
                        function: OpenAIFunctionCall {
                            name,
                            arguments: input,
                        },
                    }),
                }
            }
            OpenAIMessage {
                role,
                content,
                tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
            }
        }
        None => OpenAIMessage {
            role,
            content: String::new(),
            tool_calls: None,
        },
    }
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

fn parse_response_message(msg: OpenAIResponseMessage) -> Message {
    let mut blocks = Vec::new();

    if let Some(content) = msg.content.filter(|c| !c.is_empty()) {
        blocks.push(ContentBlock::Text { text: content });
    }

    for call in msg.tool_calls.unwrap_or_default() {
        blocks.push(ContentBlock::ToolUse {
            id: call.id,
            name: call.function.name,
            input: call.function.arguments,
        });
    }

    if blocks.is_empty() {
        blocks.push(ContentBlock::Text {
            text: String::new(),
        });
    }

    Message {
        role: Role::Assistant,
        content: Some(MessageContent::Blocks(blocks)),
    }
}

fn map_stop_reason(reason: &str) -> StopReason {
    match reason {
        "stop" => StopReason::EndTurn,
        "length" => StopReason::MaxTokens,
        "tool_calls" => StopReason::ToolUse,
        _ => {
            debug!("Unknown stop reason: {}", reason);
            StopReason::EndTurn
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_provider_creation() {
        let provider = OpenAIProvider::new("test-key").unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.config().api_key, "test-key");
        assert_eq!(provider.config().api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn test_empty_key_rejected() {
        let result = OpenAIProvider::new("");
        assert!(matches!(
            result,
            Err(crate::LLMError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_custom_config_trims_trailing_slash() {
        let config = OpenAIConfig::new("k")
            .with_api_base("http://localhost:1234/v1/")
            .with_timeout(30);
        assert_eq!(config.api_base, "http://localhost:1234/v1");
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_request_shape() {
        let request = CompletionRequest::builder("llama")
            .system("You are Mudawul")
            .add_message(Message::user("hi"))
            .temperature(0.0)
            .top_p(1.0)
            .tool_choice("auto")
            .stop_sequences(vec!["ERROR".to_string()])
            .tools(vec![ToolDefinition::new(
                "SearchCompanyStocks",
                "Search",
                json!({"type": "object"}),
            )])
            .build();

        let body = serde_json::to_value(build_request(request)).unwrap();
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert_eq!(body["max_completion_tokens"], 1024);
        assert_eq!(body["stream"], false);
        assert_eq!(body["stop"][0], "ERROR");
        assert_eq!(body["tool_choice"], "auto");
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "SearchCompanyStocks");
    }

    #[test]
    fn test_response_keeps_encoded_arguments() {
        let raw = json!({
            "content": "Let me search for that",
            "tool_calls": [{
                "id": "call_123",
                "type": "function",
                "function": {
                    "name": "SearchCompanyStocks",
                    "arguments": "{\"companyName\":\"Aramco\"}"
                }
            }]
        });
        let msg: OpenAIResponseMessage = serde_json::from_value(raw).unwrap();
        let message = parse_response_message(msg);

        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.text(), Some("Let me search for that"));
        match message.tool_uses()[0] {
            ContentBlock::ToolUse { id, name, input } => {
                assert_eq!(id, "call_123");
                assert_eq!(name, "SearchCompanyStocks");
                assert_eq!(input, &json!("{\"companyName\":\"Aramco\"}"));
            }
            ContentBlock::Text { .. } => panic!("Expected tool use"),
        }
    }

    #[test]
    fn test_empty_response_becomes_empty_text() {
        let msg = OpenAIResponseMessage {
            content: None,
            tool_calls: None,
        };
        let message = parse_response_message(msg);
        assert_eq!(message.text(), Some(""));
        assert!(!message.has_tool_uses());
    }

    #[test]
    fn test_assistant_tool_calls_round_trip_to_wire() {
        let msg = Message {
            role: Role::Assistant,
            content: Some(MessageContent::Blocks(vec![ContentBlock::ToolUse {
                id: "call_1".to_string(),
                name: "GetDetailedCompanyStockPrices".to_string(),
                input: json!("{\"tadawulID\":\"2222\"}"),
            }])),
        };
        let wire = serde_json::to_value(convert_message(msg)).unwrap();
        assert_eq!(wire["role"], "assistant");
        assert_eq!(
            wire["tool_calls"][0]["function"]["arguments"],
            "{\"tadawulID\":\"2222\"}"
        );
    }

    #[test]
    fn test_stop_reason_mapping() {
        assert_eq!(map_stop_reason("stop"), StopReason::EndTurn);
        assert_eq!(map_stop_reason("length"), StopReason::MaxTokens);
        assert_eq!(map_stop_reason("tool_calls"), StopReason::ToolUse);
        assert_eq!(map_stop_reason("unknown"), StopReason::EndTurn);
    }
}
