use crate::backends::claude::ClaudeBackend;
use crate::backends::openai::OpenAiBackend;
use crate::backends::{CompletionBackend, CompletionRequest};
use crate::config::{LlmProvider, ModelConfig};
use async_trait::async_trait;
use binwise_core::BinwiseResult;
use tracing::debug;

/// LLM client that dispatches to the correct provider backend.
pub struct LlmClient {
    backend: Box<dyn CompletionBackend>,
    model_id: String,
}

impl LlmClient {
    pub fn new(config: ModelConfig) -> BinwiseResult<Self> {
        let model_id = config.model_id.clone();
        let backend: Box<dyn CompletionBackend> = match config.provider {
            LlmProvider::Claude => Box::new(ClaudeBackend::new(config)?),
            LlmProvider::OpenAi | LlmProvider::OpenRouter | LlmProvider::Groq => {
                Box::new(OpenAiBackend::new(config)?)
            }
        };
        Ok(Self { backend, model_id })
    }

    /// Create from a pre-built backend (for custom/external providers).
    pub fn from_backend(backend: Box<dyn CompletionBackend>, model_id: impl Into<String>) -> Self {
        Self {
            backend,
            model_id: model_id.into(),
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[async_trait]
impl CompletionBackend for LlmClient {
    async fn complete(&self, request: &CompletionRequest) -> BinwiseResult<String> {
        debug!(model = %self.model_id, prompt_len = request.user_prompt.len(), "Requesting completion");
        self.backend.complete(request).await
    }
}
