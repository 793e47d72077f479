use crate::backends::{CompletionBackend, CompletionRequest};
use binwise_core::{display_bin, known_bin, BinwiseError, Classification, ClassifyError};
use binwise_graph::GraphStore;
use binwise_memory::{EmbeddingProvider, SimilaritySearch};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Number of similar items fed to the generative fallback as context.
pub const CONTEXT_NEIGHBORS: usize = 5;

/// Output budget for the fallback label when none is configured.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 50;

/// Constrains the fallback model to a bare bin label.
pub const SYSTEM_INSTRUCTION: &str = "You are an AI assistant that classifies waste items into \
bins. Your task is to respond only with the bin type, such as 'garbage bin', 'yellow bin', \
'blue bin', or 'green bin'. Provide no explanation, no extra text, and no formatting.";

/// Classifies object names: exact graph match first, then retrieval-augmented
/// generation over the most similar known items.
///
/// Holds no per-request state; one resolver serves concurrent requests. The
/// classification path never writes to the graph.
pub struct Resolver {
    store: Arc<dyn GraphStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn SimilaritySearch>,
    generator: Arc<dyn CompletionBackend>,
    max_output_tokens: u32,
}

impl Resolver {
    pub fn new(
        store: Arc<dyn GraphStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn SimilaritySearch>,
        generator: Arc<dyn CompletionBackend>,
    ) -> Self {
        Self {
            store,
            embedder,
            index,
            generator,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    /// Classify `object_name`.
    ///
    /// Any collaborator failure aborts the request with the stage that
    /// failed; there is no degraded answer.
    pub async fn classify(&self, object_name: &str) -> Result<Classification, ClassifyError> {
        let stored = self
            .store
            .find_bin(object_name)
            .await
            .map_err(ClassifyError::LookupFailed)?;
        if let Some(bin) = known_bin(stored) {
            info!(object = object_name, bin = %bin, source = "graph", "Classified");
            return Ok(Classification::new(object_name, bin));
        }

        let embedding = self
            .embedder
            .embed(object_name)
            .await
            .map_err(|e| ClassifyError::EmbeddingFailed(BinwiseError::Embedding(e)))?;

        let neighbors = self
            .index
            .nearest_names(&embedding, CONTEXT_NEIGHBORS)
            .map_err(ClassifyError::RetrievalFailed)?;
        if neighbors.is_empty() {
            warn!(object = object_name, "Index is empty, generating without context");
        }
        let context = self.assemble_context(&neighbors).await?;
        debug!(object = object_name, context_lines = context.len(), "Context assembled");

        let request = CompletionRequest {
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            user_prompt: build_prompt(&context, object_name),
            max_output_tokens: self.max_output_tokens,
        };
        let bin = self
            .generator
            .complete(&request)
            .await
            .map_err(ClassifyError::GenerationFailed)?;

        info!(object = object_name, bin = %bin, source = "generated", "Classified");
        Ok(Classification::new(object_name, bin))
    }

    /// One `"<name> goes into <bin>"` line per neighbour, in the given order.
    pub async fn assemble_context(&self, names: &[String]) -> Result<Vec<String>, ClassifyError> {
        let mut lines = Vec::with_capacity(names.len());
        for name in names {
            let bin = self
                .store
                .find_bin(name)
                .await
                .map_err(ClassifyError::LookupFailed)?;
            lines.push(context_line(name, bin.as_deref()));
        }
        Ok(lines)
    }
}

/// A context line; a missing bin renders as `None`.
pub fn context_line(name: &str, bin: Option<&str>) -> String {
    format!("{name} goes into {}", display_bin(bin))
}

/// The user prompt for the generative fallback.
pub fn build_prompt(context_lines: &[String], object_name: &str) -> String {
    format!(
        "Based on the following context:\n{}\nWhere should '{object_name}' go?",
        context_lines.join("\n")
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_context_line_absent_bin() {
        assert_eq!(context_line("cork", None), "cork goes into None");
        assert_eq!(
            context_line("cork", Some("compostable")),
            "cork goes into compostable"
        );
    }

    #[test]
    fn test_build_prompt() {
        let lines = vec![
            "glass jar goes into recyclable".to_string(),
            "tin can goes into recyclable".to_string(),
        ];
        assert_eq!(
            build_prompt(&lines, "glass bottle"),
            "Based on the following context:\n\
             glass jar goes into recyclable\n\
             tin can goes into recyclable\n\
             Where should 'glass bottle' go?"
        );
    }

    #[test]
    fn test_build_prompt_without_context() {
        assert_eq!(
            build_prompt(&[], "widget"),
            "Based on the following context:\n\nWhere should 'widget' go?"
        );
    }

    #[test]
    fn test_system_instruction_forbids_explanations() {
        assert!(SYSTEM_INSTRUCTION.contains("respond only with the bin type"));
        assert!(SYSTEM_INSTRUCTION.contains("Provide no explanation"));
    }
}
