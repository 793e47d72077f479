pub mod backends;
pub mod config;
pub mod llm;
pub mod resolver;

pub use backends::{CompletionBackend, CompletionRequest};
pub use config::{LlmProvider, ModelConfig};
pub use llm::LlmClient;
pub use resolver::{build_prompt, context_line, Resolver, CONTEXT_NEIGHBORS, SYSTEM_INSTRUCTION};
