//! LLM client against a mock OpenAI-compatible backend.

mod integration;

use futures::StreamExt;
use integration::mock_server::{finish_chunk, text_chunk, MockServerFixture};
use job_chat_gateway::llm::{LlmBackend, LlmClient};
use job_chat_gateway::types::{CompletionRequest, FinishReason, Message, ToolChoice};
use job_chat_gateway::Error;
use mockito::Matcher;
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn request() -> CompletionRequest {
    CompletionRequest {
        model: "backend-model".to_string(),
        messages: vec![Message::system("SYS"), Message::user("你好")],
        tools: Vec::new(),
        tool_choice: Some(ToolChoice::Auto),
        stream: false,
        temperature: Some(0.3),
        top_p: None,
        max_tokens: None,
    }
}

fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "cmpl-1",
        "object": "chat.completion",
        "created": 1,
        "model": "backend-model",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7}
    })
}

#[tokio::test]
async fn buffered_completion_sends_bearer_and_parses_response() {
    let fixture = MockServerFixture::new().await;
    let mock = {
        let mut server = fixture.server.lock().await;
        server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({
                "model": "backend-model",
                "stream": false,
                "tool_choice": "auto",
                "temperature": 0.3
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion_body("你好！").to_string())
            .create_async()
            .await
    };

    let client = LlmClient::new(&fixture.config().llm).unwrap();
    let resp = client
        .complete(&request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(resp.choices[0].message.text(), Some("你好！"));
    assert_eq!(resp.usage.unwrap().total_tokens, 7);
    mock.assert_async().await;
}

#[tokio::test]
async fn server_errors_are_retried_until_attempts_run_out() {
    let fixture = MockServerFixture::new().await;
    let mock = {
        let mut server = fixture.server.lock().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(503)
            .with_body("overloaded")
            .expect(3)
            .create_async()
            .await
    };

    let client = LlmClient::new(&fixture.config().llm).unwrap();
    let err = client
        .complete(&request(), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        Error::Remote { status, message, retryable, .. } => {
            assert_eq!(status, 503);
            assert_eq!(message, "overloaded");
            assert!(retryable);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let fixture = MockServerFixture::new().await;
    let mock = {
        let mut server = fixture.server.lock().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(400)
            .with_body(r#"{"error":{"message":"bad tool schema"}}"#)
            .expect(1)
            .create_async()
            .await
    };

    let client = LlmClient::new(&fixture.config().llm).unwrap();
    let err = client
        .complete(&request(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(!err.is_retryable());
    mock.assert_async().await;
}

#[tokio::test]
async fn streaming_decodes_chunks_until_done() {
    let fixture = MockServerFixture::new().await;
    let tool_fragment = json!({
        "id": "upstream-1",
        "choices": [{
            "index": 0,
            "delta": {"tool_calls": [{"index": 0, "id": "call_1", "type": "function",
                "function": {"name": "queryLocation", "arguments": null}}]},
            "finish_reason": null
        }]
    });
    let mock = fixture
        .mock_sse_stream(
            "/v1/chat/completions",
            &[text_chunk("你"), text_chunk("好"), tool_fragment, finish_chunk("tool_calls")],
        )
        .await;

    let client = LlmClient::new(&fixture.config().llm).unwrap();
    let chunks: Vec<_> = client
        .complete_streaming(&request())
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(chunks.len(), 4);
    let chunks: Vec<_> = chunks.into_iter().map(|c| c.unwrap()).collect();
    assert_eq!(chunks[0].content(), Some("你"));
    assert_eq!(chunks[1].content(), Some("好"));
    let call = &chunks[2].choices[0].delta.tool_calls[0];
    assert_eq!(call.name(), "queryLocation");
    assert_eq!(call.arguments(), "");
    assert_eq!(chunks[3].finish_reason(), Some(FinishReason::ToolCalls));
    mock.assert_async().await;
}

#[tokio::test]
async fn malformed_stream_frame_is_an_error() {
    let fixture = MockServerFixture::new().await;
    {
        let mut server = fixture.server.lock().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(format!("data: {}\n\ndata: {{not json\n\n", text_chunk("a")))
            .create_async()
            .await;
    }

    let client = LlmClient::new(&fixture.config().llm).unwrap();
    let items: Vec<_> = client
        .complete_streaming(&request())
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(items.len(), 2);
    assert!(items[0].is_ok());
    assert!(matches!(items[1], Err(Error::Protocol { .. })));
}
