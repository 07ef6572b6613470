//! Language model trait

use async_trait::async_trait;

use crate::Result;

/// Text generation service
///
/// Implementations:
/// - `OllamaBackend` - local Ollama inference (crag-llm)
/// - scripted stubs in tests
///
/// # Example
///
/// ```ignore
/// let llm: Arc<dyn LanguageModel> = Arc::new(OllamaBackend::new(config)?);
/// let text = llm.complete("Answer ONLY 'YES' or 'NO'. ...").await?;
/// ```
#[async_trait]
pub trait LanguageModel: Send + Sync + 'static {
    /// Generate a completion for a single prompt
    ///
    /// Callers are responsible for keeping the prompt within the backend's
    /// context window (truncate history rather than overflow) and for
    /// catching errors at the call site; pipeline stages never propagate a
    /// model failure to the user.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Check if the backend is reachable and the model loaded
    async fn is_available(&self) -> bool;

    /// Model name for logging
    fn model_name(&self) -> &str;

    /// Context window size in tokens
    fn context_size(&self) -> usize {
        2048
    }

    /// Rough token estimate for budget checks
    fn estimate_tokens(&self, text: &str) -> usize {
        // ~4 characters per token for English text
        text.chars().count().max(1) / 4
    }
}
