//! Integration tests for the HTTP model clients.
//!
//! Uses wiremock for HTTP mocking. Covers request shape, authentication
//! headers, Azure deployment routing, status mapping and single-attempt rate-limit handling.

use autoevals_core::{
    ChatMessage, CompletionRequest, EmbeddingRequest, EvalError, LlmClient, ModerationRequest,
    ToolDefinition,
};
use autoevals_model::{AzureConfig, AzureOpenAIClient, OpenAIClient, OpenAIConfig};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn openai_client(server: &MockServer) -> OpenAIClient {
    OpenAIClient::new(OpenAIConfig::compatible("test-key", format!("{}/v1", server.uri())))
        .expect("failed to create client")
}

fn tool_call_body(choice: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "model": "gpt-4o",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "select_choice", "arguments": format!("{{\"choice\":\"{choice}\"}}")}
                }]
            },
            "finish_reason": "tool_calls"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 3, "total_tokens": 13}
    })
}

fn classification_request() -> CompletionRequest {
    CompletionRequest::new("gpt-4o", vec![ChatMessage::user("Is this correct?")])
        .with_forced_tool(
            vec![ToolDefinition::function("select_choice", "Pick", json!({"type": "object"}))],
            "select_choice",
        )
        .with_temperature(0.0)
}

#[tokio::test]
async fn test_openai_complete_sends_forced_tool_choice() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "gpt-4o",
            "tool_choice": {"type": "function", "function": {"name": "select_choice"}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(tool_call_body("Y")))
        .expect(1)
        .mount(&server)
        .await;

    let response = openai_client(&server).complete(classification_request()).await.unwrap();
    let message = response.first_message().expect("one choice");
    assert_eq!(message.tool_calls()[0].function.arguments, r#"{"choice":"Y"}"#);
    assert_eq!(response.usage.map(|u| u.total_tokens), Some(13));
}

#[tokio::test]
async fn test_openai_embed_and_moderate() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": [{"index": 0, "embedding": [0.1, 0.2]}]})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/moderations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"flagged": true, "categories": {"hate": true}, "category_scores": {"hate": 0.9}}]
        })))
        .mount(&server)
        .await;

    let client = openai_client(&server);
    let embedding = client.embed(EmbeddingRequest::new("text-embedding-ada-002", "hello")).await.unwrap();
    assert_eq!(embedding.first_vector(), Some(&[0.1, 0.2][..]));

    let moderation =
        client.moderate(ModerationRequest { input: "x".into(), model: None }).await.unwrap();
    assert!(moderation.results[0].flagged);
    assert_eq!(moderation.results[0].category_scores["hate"], 0.9);
}

#[tokio::test]
async fn test_openai_auth_failure_is_upstream_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .expect(1)
        .mount(&server)
        .await;

    let err = openai_client(&server).complete(classification_request()).await.unwrap_err();
    match err {
        EvalError::Upstream(message) => {
            assert!(message.contains("401"));
            assert!(message.contains("invalid api key"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_rate_limit_surfaces_after_one_attempt() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .expect(1)
        .mount(&server)
        .await;

    let err = openai_client(&server).complete(classification_request()).await.unwrap_err();
    assert!(matches!(err, EvalError::Upstream(ref message) if message.contains("429")));
}

#[tokio::test]
async fn test_azure_routes_to_deployment() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/deployments/prod-gpt4o/chat/completions"))
        .and(query_param("api-version", "2024-02-15-preview"))
        .and(header("api-key", "azure-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tool_call_body("A")))
        .expect(1)
        .mount(&server)
        .await;

    let client = AzureOpenAIClient::new(
        AzureConfig::new("azure-key", server.uri()).with_deployment("prod-gpt4o"),
    )
    .unwrap();

    let response = client.complete(classification_request()).await.unwrap();
    assert_eq!(response.first_message().unwrap().tool_calls().len(), 1);
}

#[tokio::test]
async fn test_azure_uses_model_as_deployment_by_default() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/deployments/text-embedding-ada-002/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [{"embedding": [1.0]}]})))
        .expect(1)
        .mount(&server)
        .await;

    let client = AzureOpenAIClient::new(AzureConfig::new("k", server.uri())).unwrap();
    let response = client.embed(EmbeddingRequest::new("text-embedding-ada-002", "hi")).await.unwrap();
    assert_eq!(response.first_vector(), Some(&[1.0][..]));

    let err = client.moderate(ModerationRequest { input: "x".into(), model: None }).await;
    assert!(matches!(err, Err(EvalError::Unsupported(_))));
}
