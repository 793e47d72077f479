use async_trait::async_trait;
use binwise_core::{BinwiseError, BinwiseResult, EmbeddingError};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::retry::RetryPolicy;

/// Trait for computing text embeddings (vector representations).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Compute the embedding vector for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Dimension of the embedding vectors produced by this provider.
    fn dimension(&self) -> usize;
}

/// Settings for the OpenAI-compatible embedding endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_model")]
    pub model: String,
    /// Falls back to `OPENAI_API_KEY` when left empty.
    #[serde(default)]
    pub api_key: String,
    pub api_base_url: Option<String>,
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    /// Longest accepted input, in characters.
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Backoff for rate-limited calls; no retries when unset.
    #[serde(default)]
    pub retry_policy: Option<RetryPolicy>,
}

fn default_model() -> String {
    "text-embedding-ada-002".to_string()
}

fn default_dimension() -> usize {
    1536
}

fn default_max_input_chars() -> usize {
    32_000
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: String::new(),
            api_base_url: None,
            dimension: default_dimension(),
            max_input_chars: default_max_input_chars(),
            timeout_secs: default_timeout_secs(),
            retry_policy: None,
        }
    }
}

impl EmbeddingConfig {
    pub fn base_url(&self) -> &str {
        self.api_base_url
            .as_deref()
            .unwrap_or("https://api.openai.com")
    }
}

/// Embeddings from the OpenAI `/v1/embeddings` API.
pub struct OpenAiEmbedding {
    config: EmbeddingConfig,
    http: reqwest::Client,
}

impl OpenAiEmbedding {
    pub fn new(config: EmbeddingConfig) -> BinwiseResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BinwiseError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    fn validate(&self, text: &str) -> Result<(), EmbeddingError> {
        if text.is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "Cannot embed empty text".to_string(),
            ));
        }
        let chars = text.chars().count();
        if chars > self.config.max_input_chars {
            return Err(EmbeddingError::InvalidInput(format!(
                "Text is {chars} characters, limit is {}",
                self.config.max_input_chars
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.validate(text)?;

        let url = format!("{}/v1/embeddings", self.config.base_url());
        let body = serde_json::json!({
            "input": text,
            "model": self.config.model,
        });

        let resp = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbeddingError::Service(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(EmbeddingError::RateLimited { retry_after });
        }

        let resp_body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| EmbeddingError::Service(e.to_string()))?;

        if !status.is_success() {
            return Err(EmbeddingError::Service(format!(
                "Embedding API error {status}: {resp_body}"
            )));
        }

        let vector = parse_embedding_response(&resp_body, self.config.dimension)?;
        debug!(model = %self.config.model, dimension = vector.len(), "Embedded text");
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }
}

/// Extract `data[0].embedding` and check its length.
pub fn parse_embedding_response(
    body: &serde_json::Value,
    dimension: usize,
) -> Result<Vec<f32>, EmbeddingError> {
    let values = body["data"][0]["embedding"]
        .as_array()
        .ok_or_else(|| EmbeddingError::Service("Response has no embedding".to_string()))?;

    let vector = values
        .iter()
        .map(|v| v.as_f64().map(|x| x as f32))
        .collect::<Option<Vec<f32>>>()
        .ok_or_else(|| EmbeddingError::Service("Embedding contains non-numbers".to_string()))?;

    if vector.len() != dimension {
        return Err(EmbeddingError::Service(format!(
            "Expected {dimension}-dimensional embedding, got {}",
            vector.len()
        )));
    }
    Ok(vector)
}
