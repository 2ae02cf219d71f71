//! Inference gateway
//!
//! Builds the completion request for a chat turn (system preamble, answer
//! context, advertised functions) and turns the reply into an answer plus
//! proposed tool invocations.

use crate::config::ChatConfig;
use crate::error::{ChatError, Result};
use crate::models::{AnswerContext, ChatMessage, ToolFunction, ToolInvocation};
use std::fmt::Write as _;
use std::sync::Arc;
use tadawul_llm::providers::{OpenAIConfig, OpenAIProvider};
use tadawul_llm::tools::schema;
use tadawul_llm::{CompletionRequest, ContentBlock, LLMError, LLMProvider, Message, ToolDefinition};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Preamble sent ahead of every conversation
pub const SYSTEM_PROMPT: &str = "You are Mudawul, a Saudi stock market expert.\n\
Answer like a Saudi stock market expert.\n";

/// Generation stops here
const STOP_SEQUENCE: &str = "ERROR";

/// Answer and proposed calls from one inference
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InferenceReply {
    pub answer: String,
    pub tool_invocations: Vec<ToolInvocation>,
}

/// Sends sanitized conversations to the language model
#[derive(Clone)]
pub struct ChatGateway {
    provider: Arc<dyn LLMProvider>,
    model: String,
    max_tokens: usize,
}

impl ChatGateway {
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens: 1024,
        }
    }

    /// Set the completion token budget
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Gateway over the OpenAI-compatible provider described by `config`
    pub fn from_config(config: &ChatConfig) -> Result<Self> {
        let provider = OpenAIProvider::with_config(
            OpenAIConfig::new(&config.llm_api_key)
                .with_api_base(&config.llm_api_base)
                .with_timeout(config.request_timeout.as_secs()),
        )?;

        Ok(Self::new(Arc::new(provider), &config.llm_model)
            .with_max_tokens(config.max_completion_tokens))
    }

    /// Completion request for an already trimmed conversation
    pub fn build_request(
        &self,
        messages: &[ChatMessage],
        context: Option<&AnswerContext>,
    ) -> CompletionRequest {
        CompletionRequest::builder(&self.model)
            .system(system_prompt(context))
            .messages(
                messages
                    .iter()
                    .map(|m| Message::new(m.role, &m.content))
                    .collect(),
            )
            .max_tokens(self.max_tokens)
            .temperature(0.0)
            .top_p(1.0)
            .stop_sequences(vec![STOP_SEQUENCE.to_string()])
            .tools(tool_definitions())
            .tool_choice("auto")
            .build()
    }

    /// Run one inference, aborting if `cancel` fires first
    #[instrument(skip_all, fields(model = %self.model, messages = messages.len()))]
    pub async fn infer(
        &self,
        messages: &[ChatMessage],
        context: Option<&AnswerContext>,
        cancel: &CancellationToken,
    ) -> Result<InferenceReply> {
        let request = self.build_request(messages, context);

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ChatError::Inference(LLMError::Cancelled)),
            response = self.provider.complete(request) => response?,
        };

        let tool_invocations: Vec<ToolInvocation> = response
            .message
            .tool_uses()
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, input } => Some(ToolInvocation {
                    id: id.clone(),
                    function_name: name.clone(),
                    arguments_json: input.to_string(),
                }),
                ContentBlock::Text { .. } => None,
            })
            .collect();

        debug!(
            tool_calls = tool_invocations.len(),
            stop_reason = ?response.stop_reason,
            tokens = response.usage.total(),
            "Inference complete"
        );

        Ok(InferenceReply {
            answer: response.message.text().unwrap_or_default().to_string(),
            tool_invocations,
        })
    }
}

/// System preamble, extended with the prior result the user refers to
pub fn system_prompt(context: Option<&AnswerContext>) -> String {
    let mut prompt = SYSTEM_PROMPT.to_string();

    if let Some(context) = context.filter(|c| !c.chart.is_empty()) {
        let _ = write!(prompt, "Context:\n- {}\n", context.stocks);
    }

    prompt
}

/// Functions advertised to the model
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            ToolFunction::SearchCompanyStocks.as_str(),
            "Search for a company's stocks by giving the company name",
            schema::object(
                serde_json::json!({
                    "companyName": schema::string("The name of the company to search for"),
                }),
                vec!["companyName"],
            ),
        ),
        ToolDefinition::new(
            ToolFunction::GetDetailedCompanyStockPrices.as_str(),
            "Get detailed company stock prices since last month by giving the company tadawul id",
            schema::object(
                serde_json::json!({
                    "tadawulID": schema::string("The tadawul id of the company to search for"),
                }),
                vec!["tadawulID"],
            ),
        ),
    ]
}
