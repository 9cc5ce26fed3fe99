//! Language model integration
//!
//! Features:
//! - Ollama chat backend implementing `LanguageModel`
//! - Native function calling, or tool descriptions in the prompt with
//!   `[TOOL_CALL: ...]` parsing for models without it
//! - Retry with exponential backoff for transient failures

pub mod backend;
pub mod prompt;

pub use backend::{LlmConfig, OllamaBackend};
pub use prompt::{parse_tool_calls, tool_prompt};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl LlmError {
    /// Network failures, timeouts and 5xx answers are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::Network(_) | LlmError::Timeout)
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for lead_agent_core::Error {
    fn from(err: LlmError) -> Self {
        lead_agent_core::Error::Llm(err.to_string())
    }
}
