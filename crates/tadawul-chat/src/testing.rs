//! Test doubles shared across modules

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tadawul_llm::{
    CompletionRequest, CompletionResponse, ContentBlock, LLMError, LLMProvider, Message,
    MessageContent, Role, StopReason, TokenUsage,
};

/// Provider that replays canned responses and records every request
#[derive(Default)]
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<tadawul_llm::Result<CompletionResponse>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<tadawul_llm::Result<CompletionResponse>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn complete(&self, request: CompletionRequest) -> tadawul_llm::Result<CompletionResponse> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LLMError::UnexpectedResponse("script exhausted".to_string())))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Plain text answer
pub fn text_response(answer: &str) -> CompletionResponse {
    CompletionResponse {
        message: Message::assistant(answer),
        stop_reason: StopReason::EndTurn,
        usage: TokenUsage::default(),
    }
}

/// Answer proposing function calls; `arguments` are the inner JSON objects
pub fn tool_response(answer: &str, calls: &[(&str, serde_json::Value)]) -> CompletionResponse {
    let mut blocks = vec![ContentBlock::Text {
        text: answer.to_string(),
    }];
    blocks.extend(calls.iter().enumerate().map(|(i, (name, arguments))| {
        ContentBlock::ToolUse {
            id: format!("call_{i}"),
            name: (*name).to_string(),
            input: serde_json::Value::String(arguments.to_string()),
        }
    }));

    CompletionResponse {
        message: Message {
            role: Role::Assistant,
            content: Some(MessageContent::Blocks(blocks)),
        },
        stop_reason: StopReason::ToolUse,
        usage: TokenUsage::default(),
    }
}
