//! HTTP-level tests for the chat-completions client and a mockall double
//! of the Provider trait.

use async_trait::async_trait;
use mockall::mock;
use nimbus_provider::{
    ChatCompletionsProvider, ChatParams, ChatResponse, Message, Provider, ProviderError, Tool,
};
use serde_json::json;

mock! {
    pub Provider {}

    #[async_trait]
    impl Provider for Provider {
        async fn chat(&self, params: ChatParams) -> Result<ChatResponse, ProviderError>;
        fn default_model(&self) -> String;
    }
}

#[tokio::test]
async fn test_chat_posts_to_completions_endpoint() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .match_body(mockito::Matcher::PartialJson(json!({"model": "deepseek-chat"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "choices": [{
                    "message": {"role": "assistant", "content": "北京今天晴。"},
                    "finish_reason": "stop"
                }]
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let provider = ChatCompletionsProvider::new("sk-test", Some(server.url()), None);
    let params = ChatParams {
        model: "deepseek-chat".to_string(),
        messages: vec![Message::user("北京天气")],
        tools: vec![Tool::new("current_time", "time", json!({"type": "object"}))],
        ..Default::default()
    };

    let response = provider.chat(params).await.unwrap();
    assert_eq!(response.content.as_deref(), Some("北京今天晴。"));
    assert!(!response.has_tool_calls());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_chat_maps_error_status() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(json!({"error": {"message": "invalid key"}}).to_string())
        .create_async()
        .await;

    let provider = ChatCompletionsProvider::new("sk-bad", Some(server.url()), None);
    let err = provider.chat(ChatParams::default()).await.unwrap_err();
    match err {
        ProviderError::Api(msg) => assert!(msg.contains("invalid key")),
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_chat_maps_rate_limit() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(429)
        .with_body("{}")
        .create_async()
        .await;

    let provider = ChatCompletionsProvider::new("sk", Some(server.url()), None);
    let err = provider.chat(ChatParams::default()).await.unwrap_err();
    assert!(matches!(err, ProviderError::RateLimited));
}

#[tokio::test]
async fn test_mock_provider_scripted_rounds() {
    let mut mock = MockProvider::new();
    let mut seq = mockall::Sequence::new();

    mock.expect_chat()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| {
            Ok(ChatResponse::tool_calls(vec![nimbus_provider::ToolCall {
                id: "call_1".to_string(),
                name: "current_time".to_string(),
                arguments: json!({}),
            }]))
        });
    mock.expect_chat()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(ChatResponse::text("done")));

    let first = mock.chat(ChatParams::default()).await.unwrap();
    assert!(first.has_tool_calls());
    let second = mock.chat(ChatParams::default()).await.unwrap();
    assert_eq!(second.content.as_deref(), Some("done"));
}
