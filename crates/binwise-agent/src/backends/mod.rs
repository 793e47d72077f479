pub mod claude;
pub mod openai;

use async_trait::async_trait;
use binwise_core::BinwiseResult;

/// One generative call: a system instruction, a user prompt and an output budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system_instruction: String,
    pub user_prompt: String,
    pub max_output_tokens: u32,
}

/// Trait for generative completion backends.
///
/// Each provider (OpenAI-compatible, Claude) implements this trait to handle
/// API communication. The returned text is the model's output, unmodified.
///
/// To add a new provider:
/// 1. Create a new module in `backends/`
/// 2. Implement `CompletionBackend` for your struct
/// 3. Add the variant to `LlmProvider` in `config.rs`
/// 4. Wire it up in `LlmClient::new()` in `llm.rs`
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Run a single non-streaming completion.
    async fn complete(&self, request: &CompletionRequest) -> BinwiseResult<String>;
}

pub(crate) fn http_client(timeout_secs: u64) -> BinwiseResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| {
            binwise_core::BinwiseError::Config(format!("Failed to build HTTP client: {e}"))
        })
}
