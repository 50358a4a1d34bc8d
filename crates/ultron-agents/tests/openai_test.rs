use serde_json::json;
use ultron_agents::{
    ChatMessage, ChatRole, ContentBlock, LlmProvider, LlmRequest, OpenAiProvider, SamplingParams,
    ToolDefinition,
};
use ultron_common::Error;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn user_request(text: &str, tools: Vec<ToolDefinition>) -> LlmRequest {
    LlmRequest {
        model: "gpt-4o-mini".to_string(),
        messages: vec![ChatMessage::text(ChatRole::User, text)],
        system: Some("You are a helpful assistant.".to_string()),
        max_tokens: Some(500),
        sampling: SamplingParams::default(),
        tools,
    }
}

fn price_tool() -> ToolDefinition {
    ToolDefinition {
        name: "get_crypto_price".to_string(),
        description: "Get prices".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "symbols": {"type": "array", "items": {"type": "string"}}
            }
        }),
    }
}

#[tokio::test]
async fn test_openai_completion() {
    let mock_server = MockServer::start().await;

    let response_body = json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "created": 1677652288,
        "model": "gpt-4o-mini-2024-07-18",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": "Hello there!",
            },
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": 9,
            "completion_tokens": 12,
            "total_tokens": 21
        }
    });

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "max_tokens": 500,
            "temperature": 0.7,
            "top_p": 1.0,
            "frequency_penalty": 0.5,
            "presence_penalty": 0.0,
            "messages": [
                {"role": "system", "content": "You are a helpful assistant."},
                {"role": "user", "content": "Hello"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new("test-key".to_string(), Some(mock_server.uri()));
    let response = provider
        .complete(&user_request("Hello", vec![]))
        .await
        .unwrap();

    assert_eq!(response.content.len(), 1);
    match &response.content[0] {
        ContentBlock::Text { text } => assert_eq!(text, "Hello there!"),
        _ => panic!("Expected text content"),
    }
    let usage = response.usage.expect("usage should be reported");
    assert_eq!(usage.input_tokens, 9);
    assert_eq!(usage.output_tokens, 12);
}

#[tokio::test]
async fn test_openai_tool_use() {
    let mock_server = MockServer::start().await;

    let response_body = json!({
        "id": "chatcmpl-456",
        "object": "chat.completion",
        "created": 1677652288,
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_abc123",
                    "type": "function",
                    "function": {
                        "name": "get_crypto_price",
                        "arguments": "{\"symbols\": [\"BTC\"]}"
                    }
                }]
            },
            "finish_reason": "tool_calls"
        }]
    });

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"tool_choice": "auto"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new("test-key".to_string(), Some(mock_server.uri()));
    let response = provider
        .complete(&user_request("What's BTC worth?", vec![price_tool()]))
        .await
        .unwrap();

    assert_eq!(response.content.len(), 1);
    match &response.content[0] {
        ContentBlock::ToolUse { id, name, input } => {
            assert_eq!(id, "call_abc123");
            assert_eq!(name, "get_crypto_price");
            assert_eq!(input["symbols"][0], "BTC");
        }
        _ => panic!("Expected tool use"),
    }
    assert_eq!(response.stop_reason.as_deref(), Some("tool_calls"));
}

#[tokio::test]
async fn test_openai_unauthorized_maps_to_authentication_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
        })))
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new("bad-key".to_string(), Some(mock_server.uri()));
    let err = provider
        .complete(&user_request("Hello", vec![]))
        .await
        .expect_err("should fail");
    assert!(matches!(err, Error::Authentication(_)), "{err:?}");
}

#[tokio::test]
async fn test_openai_throttling_maps_to_rate_limited() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new("test-key".to_string(), Some(mock_server.uri()));
    let err = provider
        .complete(&user_request("Hello", vec![]))
        .await
        .expect_err("should fail");
    assert!(matches!(err, Error::RateLimited(_)), "{err:?}");
}

#[tokio::test]
async fn test_openai_server_error_is_generic() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new("test-key".to_string(), Some(mock_server.uri()));
    let err = provider
        .complete(&user_request("Hello", vec![]))
        .await
        .expect_err("should fail");
    assert!(matches!(err, Error::Agent(ref msg) if msg.contains("upstream exploded")));
}

#[tokio::test]
async fn test_openai_unreachable_maps_to_network_error() {
    // Nothing listens on the discard port.
    let provider = OpenAiProvider::new("test-key".to_string(), Some("http://127.0.0.1:9".into()));
    let err = provider
        .complete(&user_request("Hello", vec![]))
        .await
        .expect_err("should fail");
    assert!(matches!(err, Error::Network(_)), "{err:?}");
}

#[tokio::test]
async fn test_openai_health_check() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new("test-key".to_string(), Some(mock_server.uri()));
    assert!(provider.health_check().await.unwrap());
}

#[tokio::test]
async fn test_openai_health_check_rejected_key() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new("sk-bad".to_string(), Some(mock_server.uri()));
    assert!(!provider.health_check().await.unwrap());
}
