use quill_poet::{
    ChatMessage, ChatModel, CompletionRequest, FinishReason, LlmConfig, OpenAiCompatProvider,
    ProviderError, ToolDefinition,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(base_url: &str) -> OpenAiCompatProvider {
    let config = LlmConfig {
        base_url: base_url.to_string(),
        model: "gemini-1.5-flash".into(),
        temperature: 0.5,
        ..LlmConfig::default()
    };
    OpenAiCompatProvider::new(&config, "test-key").unwrap()
}

fn request() -> CompletionRequest {
    CompletionRequest::new(vec![
        ChatMessage::system("You are a poet."),
        ChatMessage::user("Write something."),
    ])
}

#[tokio::test]
async fn test_text_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "gemini-1.5-flash",
            "temperature": 0.5,
            "messages": [{ "role": "system", "content": "You are a poet." }, { "role": "user", "content": "Write something." }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "model": "gemini-1.5-flash",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "Roses bloom" },
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = provider(&server.uri()).complete(request()).await.unwrap();
    assert_eq!(response.content.as_deref(), Some("Roses bloom"));
    assert!(response.tool_calls.is_empty());
    assert_eq!(response.finish_reason, FinishReason::Stop);
}

#[tokio::test]
async fn test_tool_call_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "tools": [{ "type": "function", "function": { "name": "human_input" } }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {
                            "name": "human_input",
                            "arguments": "{\"question\":\"How many words?\"}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        })))
        .mount(&server)
        .await;

    let req = request().with_tools(vec![ToolDefinition::new("human_input", "Ask a human")]);
    let response = provider(&server.uri()).complete(req).await.unwrap();

    assert_eq!(response.finish_reason, FinishReason::ToolCalls);
    assert_eq!(response.tool_calls.len(), 1);
    let call = &response.tool_calls[0];
    assert_eq!(call.id, "call_abc");
    assert_eq!(call.name(), "human_input");
    assert_eq!(call.arguments(), r#"{"question":"How many words?"}"#);
}

#[tokio::test]
async fn test_error_statuses() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let provider = provider(&server.uri());
    assert!(matches!(
        provider.complete(request()).await,
        Err(ProviderError::AuthenticationFailed)
    ));
    assert!(matches!(
        provider.complete(request()).await,
        Err(ProviderError::RateLimited)
    ));
    match provider.complete(request()).await {
        Err(ProviderError::Api { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "boom");
        }
        other => panic!("expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_choices() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let err = provider(&server.uri()).complete(request()).await.unwrap_err();
    assert!(matches!(err, ProviderError::NoChoices));
}
