//! Configuration for the chat service

use crate::error::{ChatError, Result};
use std::path::PathBuf;
use std::time::Duration;
use tadawul_llm::providers::openai::DEFAULT_API_BASE;
use tadawul_utils::EnvReader;

/// Default RapidAPI endpoint for Saudi Exchange data
pub const DEFAULT_RAPID_API_BASE: &str = "https://saudi-exchange-stocks-tadawul.p.rapidapi.com/v1";

/// Where market data comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DataMode {
    /// Real RapidAPI calls
    #[default]
    Live,
    /// Randomised data, no network
    Synthetic,
}

/// Configuration for the chat service, loaded once at start-up
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Key for the chat completions API
    pub llm_api_key: String,

    /// Model used for chat turns
    pub llm_model: String,

    /// Base URL of the chat completions API
    pub llm_api_base: String,

    /// RapidAPI key used for price history
    pub rapid_api_v1_key: Option<String>,

    /// RapidAPI key used for search and movers
    pub rapid_api_v2_key: Option<String>,

    /// Value of the `x-rapidapi-host` header
    pub rapid_api_host: Option<String>,

    /// Base URL of the market data API
    pub rapid_api_base: String,

    /// Market data strategy
    pub data_mode: DataMode,

    /// Company map file; the embedded table is used when unset
    pub company_map_path: Option<PathBuf>,

    /// Timeout applied to every outbound HTTP request
    pub request_timeout: Duration,

    /// Most recent messages sent for inference
    pub max_history: usize,

    /// Completion token budget per turn
    pub max_completion_tokens: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            llm_model: String::new(),
            llm_api_base: DEFAULT_API_BASE.to_string(),
            rapid_api_v1_key: None,
            rapid_api_v2_key: None,
            rapid_api_host: None,
            rapid_api_base: DEFAULT_RAPID_API_BASE.to_string(),
            data_mode: DataMode::Live,
            company_map_path: None,
            request_timeout: Duration::from_secs(30),
            max_history: 50,
            max_completion_tokens: 1024,
        }
    }
}

impl ChatConfig {
    /// Create a new configuration builder
    pub fn builder() -> ChatConfigBuilder {
        ChatConfigBuilder::default()
    }

    /// Load from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_reader(EnvReader::from_process())
    }

    /// Load from an arbitrary variable source
    ///
    /// Every missing required variable is reported in a single error.
    pub fn from_reader(mut env: EnvReader) -> Result<Self> {
        let defaults = Self::default();
        let data_mode = if env.flag("MOCK_DATA") {
            DataMode::Synthetic
        } else {
            DataMode::Live
        };

        let llm_api_key = env.required("GROQ_API_KEY");
        let llm_model = env.required("LLM_MODEL");

        let (rapid_api_v1_key, rapid_api_v2_key, rapid_api_host) = match data_mode {
            DataMode::Live => (
                Some(env.required("RAPID_API_V1_KEY")),
                Some(env.required("RAPID_API_V2_KEY")),
                Some(env.required("RAPID_API_HOST")),
            ),
            DataMode::Synthetic => (
                env.optional("RAPID_API_V1_KEY"),
                env.optional("RAPID_API_V2_KEY"),
                env.optional("RAPID_API_HOST"),
            ),
        };

        if !env.missing().is_empty() {
            return Err(ChatError::Config(format!(
                "missing required environment variables: {}",
                env.missing().join(", ")
            )));
        }

        let request_timeout = match env.optional("REQUEST_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(raw.parse().map_err(|_| {
                ChatError::Config(format!("REQUEST_TIMEOUT_SECS is not a number: {raw}"))
            })?),
            None => defaults.request_timeout,
        };

        let config = Self {
            llm_api_key,
            llm_model,
            llm_api_base: env.optional("LLM_API_BASE").unwrap_or(defaults.llm_api_base),
            rapid_api_v1_key,
            rapid_api_v2_key,
            rapid_api_host,
            rapid_api_base: env
                .optional("RAPID_API_BASE")
                .unwrap_or(defaults.rapid_api_base),
            data_mode,
            company_map_path: env.optional("COMPANY_MAP_PATH").map(PathBuf::from),
            request_timeout,
            ..defaults
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.llm_api_key.is_empty() {
            return Err(ChatError::Config("LLM API key is required".to_string()));
        }

        if self.llm_model.is_empty() {
            return Err(ChatError::Config("LLM model is required".to_string()));
        }

        if self.data_mode == DataMode::Live
            && (self.rapid_api_v1_key.is_none()
                || self.rapid_api_v2_key.is_none()
                || self.rapid_api_host.is_none())
        {
            return Err(ChatError::Config(
                "RapidAPI keys and host are required for live market data".to_string(),
            ));
        }

        if self.max_history == 0 {
            return Err(ChatError::Config(
                "max_history must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(ChatError::Config(
                "request_timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for ChatConfig
#[derive(Debug, Default)]
pub struct ChatConfigBuilder {
    llm_api_key: Option<String>,
    llm_model: Option<String>,
    llm_api_base: Option<String>,
    rapid_api_v1_key: Option<String>,
    rapid_api_v2_key: Option<String>,
    rapid_api_host: Option<String>,
    rapid_api_base: Option<String>,
    data_mode: Option<DataMode>,
    company_map_path: Option<PathBuf>,
    request_timeout: Option<Duration>,
    max_history: Option<usize>,
    max_completion_tokens: Option<usize>,
}

impl ChatConfigBuilder {
    /// Set the chat completions API key
    pub fn llm_api_key(mut self, key: impl Into<String>) -> Self {
        self.llm_api_key = Some(key.into());
        self
    }

    /// Set the model
    pub fn llm_model(mut self, model: impl Into<String>) -> Self {
        self.llm_model = Some(model.into());
        self
    }

    /// Set the chat completions base URL
    pub fn llm_api_base(mut self, base: impl Into<String>) -> Self {
        self.llm_api_base = Some(base.into());
        self
    }

    /// Set both RapidAPI keys and the host header
    pub fn rapid_api(
        mut self,
        v1_key: impl Into<String>,
        v2_key: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        self.rapid_api_v1_key = Some(v1_key.into());
        self.rapid_api_v2_key = Some(v2_key.into());
        self.rapid_api_host = Some(host.into());
        self
    }

    /// Set the market data base URL
    pub fn rapid_api_base(mut self, base: impl Into<String>) -> Self {
        self.rapid_api_base = Some(base.into());
        self
    }

    /// Set the market data strategy
    pub fn data_mode(mut self, mode: DataMode) -> Self {
        self.data_mode = Some(mode);
        self
    }

    /// Load the company map from a file
    pub fn company_map_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.company_map_path = Some(path.into());
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Set the history window
    pub fn max_history(mut self, max_history: usize) -> Self {
        self.max_history = Some(max_history);
        self
    }

    /// Set the completion token budget
    pub fn max_completion_tokens(mut self, tokens: usize) -> Self {
        self.max_completion_tokens = Some(tokens);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<ChatConfig> {
        let defaults = ChatConfig::default();

        let config = ChatConfig {
            llm_api_key: self.llm_api_key.unwrap_or(defaults.llm_api_key),
            llm_model: self.llm_model.unwrap_or(defaults.llm_model),
            llm_api_base: self.llm_api_base.unwrap_or(defaults.llm_api_base),
            rapid_api_v1_key: self.rapid_api_v1_key,
            rapid_api_v2_key: self.rapid_api_v2_key,
            rapid_api_host: self.rapid_api_host,
            rapid_api_base: self.rapid_api_base.unwrap_or(defaults.rapid_api_base),
            data_mode: self.data_mode.unwrap_or(defaults.data_mode),
            company_map_path: self.company_map_path,
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            max_history: self.max_history.unwrap_or(defaults.max_history),
            max_completion_tokens: self
                .max_completion_tokens
                .unwrap_or(defaults.max_completion_tokens),
        };

        config.validate()?;
        Ok(config)
    }
}
