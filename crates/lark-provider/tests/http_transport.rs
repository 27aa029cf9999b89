//! The built-in HTTP providers against a mock chat completions server.

use lark_provider::providers::register_builtin;
use lark_provider::{
    InvokeOptions, Message, Provider, ProviderConfig, ProviderError, ProviderRegistry,
    StreamStatus,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn registry_for(server: &MockServer, provider: &str) -> ProviderRegistry {
    let registry = ProviderRegistry::new();
    register_builtin(&registry);
    registry.configure(
        provider,
        ProviderConfig::new("sk-test").with_base_url(server.uri()),
    );
    registry
}

#[tokio::test]
async fn test_complete_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"model": "deepseek-chat", "stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "model": "deepseek-chat",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "hello"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 3, "completion_tokens": 1, "total_tokens": 4}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let registry = registry_for(&server, "deepseek").await;
    let response = registry
        .lookup("deepseek")
        .unwrap()
        .invoke(
            CancellationToken::new(),
            vec![Message::user_text("hi")],
            InvokeOptions::default(),
        )
        .await
        .unwrap();
    assert!(!response.is_stream());

    let completion = response.result().await.unwrap();
    assert_eq!(completion.text, "hello");
    assert_eq!(completion.finish_reason.as_deref(), Some("stop"));
    assert_eq!(completion.usage.unwrap().total_tokens, 4);
}

#[tokio::test]
async fn test_tool_call_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "gpt-4o-mini",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "current_date", "arguments": "{}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        })))
        .mount(&server)
        .await;

    let registry = registry_for(&server, "openai").await;
    let completion = registry
        .lookup("openai")
        .unwrap()
        .invoke(
            CancellationToken::new(),
            vec![Message::user_text("what day is it?")],
            InvokeOptions::default(),
        )
        .await
        .unwrap()
        .result()
        .await
        .unwrap();
    assert_eq!(completion.text, "");
    assert_eq!(completion.tool_calls.len(), 1);
    assert_eq!(completion.tool_calls[0].name, "current_date");
}

#[tokio::test]
async fn test_streamed_request() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"h\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"i\"},\"finish_reason\":\"stop\"}]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let registry = registry_for(&server, "openai").await;
    let mut response = registry
        .lookup("openai")
        .unwrap()
        .invoke(
            CancellationToken::new(),
            vec![Message::user_text("hi")],
            InvokeOptions::streaming(),
        )
        .await
        .unwrap();

    let handle = response.stream().unwrap();
    let mut texts = Vec::new();
    let mut last_final = false;
    while let Some(delta) = handle.take().await {
        texts.push(delta.text.clone());
        last_final = delta.is_final;
    }
    assert_eq!(texts, ["h", "i", ""]);
    assert!(last_final);
    assert!(handle.take().await.is_none());
    assert_eq!(handle.status(), StreamStatus::Completed);
    assert_eq!(handle.text(), "hi");
}

#[tokio::test]
async fn test_stream_error_chunk_fails_stream() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"par\"}}]}\n\n",
        "data: {\"error\":{\"message\":\"rate limited\"}}\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let registry = registry_for(&server, "qwen").await;
    let response = registry
        .lookup("qwen")
        .unwrap()
        .invoke(
            CancellationToken::new(),
            vec![Message::user_text("hi")],
            InvokeOptions::streaming(),
        )
        .await
        .unwrap();
    let err = response.result().await.unwrap_err();
    assert!(err.to_string().contains("rate limited"));
}

#[tokio::test]
async fn test_http_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let registry = registry_for(&server, "moonshot").await;
    let err = registry
        .lookup("moonshot")
        .unwrap()
        .invoke(
            CancellationToken::new(),
            vec![Message::user_text("hi")],
            InvokeOptions::default(),
        )
        .await
        .unwrap_err();
    match err {
        ProviderError::Api { status, message } => {
            assert_eq!(status, 401);
            assert!(message.contains("invalid api key"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_server_error_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let registry = registry_for(&server, "zhipu").await;
    let err = registry
        .lookup("zhipu")
        .unwrap()
        .invoke(
            CancellationToken::new(),
            vec![Message::user_text("hi")],
            InvokeOptions::default(),
        )
        .await
        .unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_keyless_ollama_sends_no_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "local"}, "finish_reason": "stop"}]
        })))
        .mount(&server)
        .await;

    let registry = ProviderRegistry::new();
    register_builtin(&registry);
    registry.configure("ollama", ProviderConfig {
        api_key: None,
        base_url: Some(server.uri()),
    });
    let completion = registry
        .lookup("ollama")
        .unwrap()
        .invoke(
            CancellationToken::new(),
            vec![Message::user_text("hi")],
            InvokeOptions::default(),
        )
        .await
        .unwrap()
        .result()
        .await
        .unwrap();
    assert_eq!(completion.text, "local");
    assert_eq!(completion.model, "llama3.2");

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}
