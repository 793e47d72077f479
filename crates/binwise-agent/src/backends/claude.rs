use super::{http_client, CompletionBackend, CompletionRequest};
use crate::config::ModelConfig;
use async_trait::async_trait;
use binwise_core::{BinwiseError, BinwiseResult};

/// Claude (Anthropic) messages API backend.
pub struct ClaudeBackend {
    config: ModelConfig,
    http: reqwest::Client,
}

impl ClaudeBackend {
    pub fn new(config: ModelConfig) -> BinwiseResult<Self> {
        let http = http_client(config.timeout_secs)?;
        Ok(Self { config, http })
    }
}

#[async_trait]
impl CompletionBackend for ClaudeBackend {
    async fn complete(&self, request: &CompletionRequest) -> BinwiseResult<String> {
        let url = format!("{}/v1/messages", self.config.base_url());

        let mut body = serde_json::json!({
            "model": self.config.model_id,
            "max_tokens": request.max_output_tokens,
            "system": request.system_instruction,
            "messages": [{"role": "user", "content": request.user_prompt}],
        });
        if let Some(temperature) = self.config.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }

        let resp = self
            .http
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
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
                "Claude API error {status}: {resp_body}"
            )));
        }

        parse_claude_response(&resp_body)
    }
}

/// Concatenated text blocks of a messages API response.
pub fn parse_claude_response(body: &serde_json::Value) -> BinwiseResult<String> {
    let content = body["content"].as_array().ok_or_else(|| {
        BinwiseError::GenerationFailed("Missing content in Claude response".into())
    })?;

    let text_parts: Vec<&str> = content
        .iter()
        .filter(|block| block["type"].as_str() == Some("text"))
        .filter_map(|block| block["text"].as_str())
        .collect();

    if text_parts.is_empty() {
        return Err(BinwiseError::GenerationFailed(
            "Claude response has no text blocks".into(),
        ));
    }
    Ok(text_parts.concat())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_block() {
        let body = serde_json::json!({
            "content": [{"type": "text", "text": "green bin"}],
            "stop_reason": "end_turn"
        });
        assert_eq!(parse_claude_response(&body).unwrap(), "green bin");
    }

    #[test]
    fn test_parse_joins_text_blocks_verbatim() {
        let body = serde_json::json!({
            "content": [
                {"type": "text", "text": "green"},
                {"type": "tool_use", "id": "t1", "name": "noop", "input": {}},
                {"type": "text", "text": " bin"}
            ]
        });
        assert_eq!(parse_claude_response(&body).unwrap(), "green bin");
    }

    #[test]
    fn test_parse_without_text_blocks() {
        let body = serde_json::json!({"content": []});
        assert!(parse_claude_response(&body).is_err());
        assert!(parse_claude_response(&serde_json::json!({"type": "error"})).is_err());
    }
}
