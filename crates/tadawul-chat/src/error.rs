//! Error types for chat and market data operations

use thiserror::Error;

/// Generic message shown to users for any failure
pub const PROCESSING_ERROR_MESSAGE: &str = "An error occurred while processing your request.";

/// Message shown when a chart is requested for an unmapped company id
pub const INVALID_COMPANY_MESSAGE: &str = "Invalid company id.";

/// Failure of a single market data call
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network or HTTP client error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Provider answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Body could not be decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider reported a failure in its envelope
    #[error("API error: {0}")]
    Api(String),

    /// The caller cancelled or timed out before the call finished
    #[error("Request cancelled")]
    Cancelled,
}

/// Result type alias for market data calls
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Stage of the two-step tool argument decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStage {
    /// Unwrapping the outer JSON string
    Wrapper,
    /// Parsing the inner argument object
    Arguments,
}

impl std::fmt::Display for DecodeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wrapper => f.write_str("arguments wrapper"),
            Self::Arguments => f.write_str("arguments"),
        }
    }
}

/// Chat orchestration errors
#[derive(Debug, Error)]
pub enum ChatError {
    /// Tool call arguments could not be decoded
    #[error("Error decoding {stage} for {function}: {source}")]
    ArgumentDecode {
        function: String,
        stage: DecodeStage,
        #[source]
        source: serde_json::Error,
    },

    /// A market data call failed
    #[error("Error getting {context}: {source}")]
    DataFetch {
        context: String,
        #[source]
        source: FetchError,
    },

    /// The language model call failed
    #[error("Inference error: {0}")]
    Inference(#[from] tadawul_llm::LLMError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The company map could not be loaded
    #[error("Company map error: {0}")]
    CompanyMap(String),

    /// No tadawul id is mapped to this company id
    #[error("Unknown company id: {0}")]
    UnknownCompany(i64),

    /// A spawned fetch task panicked or was aborted
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ChatError {
    /// Wrap a fetch failure with the call site it happened at
    pub fn fetch(context: impl Into<String>, source: FetchError) -> Self {
        Self::DataFetch {
            context: context.into(),
            source,
        }
    }

    /// Message safe to show to an end user
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::UnknownCompany(_) => INVALID_COMPANY_MESSAGE,
            _ => PROCESSING_ERROR_MESSAGE,
        }
    }
}

/// Result type alias for chat operations
pub type Result<T> = std::result::Result<T, ChatError>;
