//! Language model integration
//!
//! Features:
//! - Ollama backend with retry, keep-alive and bounded context/output
//! - Prompt builders for every pipeline stage
//! - Fixed response templates for canned replies

pub mod backend;
pub mod prompt;

pub use backend::{LlmConfig, OllamaBackend};
pub use prompt::{
    classification_prompt, name_extraction_prompt, rewrite_prompt, synthesis_prompt,
    ResponseTemplates, NOT_FOUND_SENTENCE,
};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),
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

impl From<LlmError> for crag_core::Error {
    fn from(err: LlmError) -> Self {
        crag_core::Error::Llm(err.to_string())
    }
}
