#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Provider configuration and HTTP behaviour of the completion backends.

use binwise_agent::{CompletionBackend, CompletionRequest, LlmClient, LlmProvider, ModelConfig};
use binwise_core::BinwiseError;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request() -> CompletionRequest {
    CompletionRequest {
        system_instruction: "Answer with a bin.".into(),
        user_prompt: "Where should 'cup' go?".into(),
        max_output_tokens: 50,
    }
}

fn config_for(provider: LlmProvider, server: &MockServer) -> ModelConfig {
    ModelConfig {
        provider,
        api_key: "test-key".into(),
        api_base_url: Some(server.uri()),
        ..ModelConfig::default()
    }
}

// --- ModelConfig & LlmProvider ---

#[test]
fn test_llm_provider_serialization() {
    assert_eq!(serde_json::to_string(&LlmProvider::OpenAi).unwrap(), "\"openai\"");
    assert_eq!(
        serde_json::to_string(&LlmProvider::OpenRouter).unwrap(),
        "\"openrouter\""
    );
    let provider: LlmProvider = serde_json::from_str("\"claude\"").unwrap();
    assert_eq!(provider, LlmProvider::Claude);
}

#[test]
fn test_model_config_defaults_from_toml() {
    let config: ModelConfig = toml::from_str("").unwrap();
    assert_eq!(config.provider, LlmProvider::OpenAi);
    assert_eq!(config.model_id, "gpt-4o-mini");
    assert_eq!(config.max_tokens, 50);
    assert_eq!(config.timeout_secs, 30);
    assert!(config.temperature.is_none());
    assert!(config.api_key.is_empty());
}

#[test]
fn test_model_config_from_toml() {
    let config: ModelConfig = toml::from_str(
        r#"
provider = "groq"
model_id = "llama-3.1-8b-instant"
temperature = 0.0
max_tokens = 16
"#,
    )
    .unwrap();
    assert_eq!(config.provider, LlmProvider::Groq);
    assert_eq!(config.model_id, "llama-3.1-8b-instant");
    assert_eq!(config.temperature, Some(0.0));
    assert_eq!(config.max_tokens, 16);
}

#[test]
fn test_base_url_per_provider() {
    let mut config = ModelConfig::default();
    assert_eq!(config.base_url(), "https://api.openai.com");
    config.provider = LlmProvider::Claude;
    assert_eq!(config.base_url(), "https://api.anthropic.com");
    config.provider = LlmProvider::OpenRouter;
    assert_eq!(config.base_url(), "https://openrouter.ai/api");
    config.api_base_url = Some("http://localhost:9999".into());
    assert_eq!(config.base_url(), "http://localhost:9999");
}

#[test]
fn test_api_key_env_per_provider() {
    let mut config = ModelConfig::default();
    assert_eq!(config.api_key_env(), "OPENAI_API_KEY");
    config.provider = LlmProvider::Claude;
    assert_eq!(config.api_key_env(), "ANTHROPIC_API_KEY");
    config.provider = LlmProvider::Groq;
    assert_eq!(config.api_key_env(), "GROQ_API_KEY");
}

// --- OpenAI-compatible ---

#[tokio::test]
async fn test_openai_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(serde_json::json!({
            "model": "gpt-4o-mini",
            "max_tokens": 50,
            "messages": [
                {"role": "system", "content": "Answer with a bin."},
                {"role": "user", "content": "Where should 'cup' go?"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "yellow bin"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = LlmClient::new(config_for(LlmProvider::OpenAi, &server)).unwrap();
    assert_eq!(client.model_id(), "gpt-4o-mini");
    assert_eq!(client.complete(&request()).await.unwrap(), "yellow bin");
}

#[tokio::test]
async fn test_openrouter_sends_title_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("x-title", "Binwise"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"content": "blue bin"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = LlmClient::new(config_for(LlmProvider::OpenRouter, &server)).unwrap();
    assert_eq!(client.complete(&request()).await.unwrap(), "blue bin");
}

#[tokio::test]
async fn test_openai_error_status_is_generation_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": {"message": "invalid api key"}
        })))
        .mount(&server)
        .await;

    let client = LlmClient::new(config_for(LlmProvider::OpenAi, &server)).unwrap();
    let err = client.complete(&request()).await.unwrap_err();
    match err {
        BinwiseError::GenerationFailed(msg) => assert!(msg.contains("401")),
        other => panic!("unexpected error: {other}"),
    }
}

// --- Claude ---

#[tokio::test]
async fn test_claude_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(serde_json::json!({
            "system": "Answer with a bin.",
            "messages": [{"role": "user", "content": "Where should 'cup' go?"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "content": [{"type": "text", "text": "green bin"}],
            "stop_reason": "end_turn"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = LlmClient::new(ModelConfig {
        model_id: "claude-3-5-haiku-latest".into(),
        ..config_for(LlmProvider::Claude, &server)
    })
    .unwrap();
    assert_eq!(client.complete(&request()).await.unwrap(), "green bin");
}

#[tokio::test]
async fn test_claude_overloaded_is_generation_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(529).set_body_json(serde_json::json!({
            "type": "error",
            "error": {"type": "overloaded_error"}
        })))
        .mount(&server)
        .await;

    let client = LlmClient::new(config_for(LlmProvider::Claude, &server)).unwrap();
    assert!(matches!(
        client.complete(&request()).await.unwrap_err(),
        BinwiseError::GenerationFailed(_)
    ));
}
