use super::{http_client, CompletionBackend, CompletionRequest};
use crate::config::{LlmProvider, ModelConfig};
use async_trait::async_trait;
use binwise_core::{BinwiseError, BinwiseResult};

/// OpenAI-compatible chat completions backend.
///
/// Works with OpenAI, OpenRouter, Groq, and any other provider that
/// implements the OpenAI chat completions API.
pub struct OpenAiBackend {
    config: ModelConfig,
    http: reqwest::Client,
}

impl OpenAiBackend {
    pub fn new(config: ModelConfig) -> BinwiseResult<Self> {
        let http = http_client(config.timeout_secs)?;
        Ok(Self { config, http })
    }

    fn build_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.config.model_id,
            "max_tokens": request.max_output_tokens,
            "messages": [
                {"role": "system", "content": request.system_instruction},
                {"role": "user", "content": request.user_prompt},
            ],
        });
        if let Some(temperature) = self.config.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }
        body
    }

    fn add_provider_headers(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json");

        // OpenRouter requires extra headers
        if matches!(self.config.provider, LlmProvider::OpenRouter) {
            request.header("X-Title", "Binwise")
        } else {
            request
        }
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn complete(&self, request: &CompletionRequest) -> BinwiseResult<String> {
        let url = format!("{}/v1/chat/completions", self.config.base_url());
        let body = self.build_body(request);

        let resp = self
            .add_provider_headers(self.http.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| BinwiseError::GenerationFailed(e.to_string()))?;

        let status = resp.status();
        let resp_body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| BinwiseError::GenerationFailed(e.to_string()))?;

        if !status.is_success() {
            return Err(BinwiseError::GenerationFailed(format!(
                "OpenAI API error {status}: {resp_body}"
            )));
        }

        parse_openai_response(&resp_body)
    }
}

/// Text of `choices[0].message.content`, exactly as returned.
pub fn parse_openai_response(body: &serde_json::Value) -> BinwiseResult<String> {
    body["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| {
            BinwiseError::GenerationFailed("Missing content in OpenAI response".to_string())
        })
}
