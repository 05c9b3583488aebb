//! End-to-end tests through the axum router.

mod integration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use integration::mock_server::{finish_chunk, text_chunk, MockServerFixture};
use job_chat_gateway::clients::ImageTextExtractor;
use job_chat_gateway::config::GatewayConfig;
use job_chat_gateway::llm::LlmBackend;
use job_chat_gateway::resolve::RESUME_LABEL;
use job_chat_gateway::server::{router, AppState};
use job_chat_gateway::tools::ToolDispatcher;
use job_chat_gateway::types::{ChatCompletionChunk, ChatCompletionResponse, CompletionRequest};
use job_chat_gateway::{BoxStream, Error, Result};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

/// Buffered backend answering from a fixed script.
#[derive(Default)]
struct ScriptedLlm {
    responses: Mutex<VecDeque<Value>>,
    requests: Mutex<Vec<CompletionRequest>>,
    /// Repeat the last response forever instead of running dry.
    repeat: bool,
}

impl ScriptedLlm {
    fn new(responses: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            ..Self::default()
        })
    }

    fn repeating(response: Value) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(vec![response].into()),
            repeat: true,
            ..Self::default()
        })
    }
}

#[async_trait]
impl LlmBackend for ScriptedLlm {
    async fn complete(
        &self,
        request: &CompletionRequest,
        _cancel: &CancellationToken,
    ) -> Result<ChatCompletionResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let mut responses = self.responses.lock().unwrap();
        let next = if self.repeat {
            responses.front().cloned()
        } else {
            responses.pop_front()
        };
        let value = next.ok_or_else(|| Error::runtime("script exhausted"))?;
        Ok(serde_json::from_value(value).unwrap())
    }

    async fn complete_streaming(
        &self,
        _request: &CompletionRequest,
    ) -> Result<BoxStream<'static, ChatCompletionChunk>> {
        Err(Error::runtime("streaming not scripted"))
    }
}

struct FixedOcr(&'static str);

#[async_trait]
impl ImageTextExtractor for FixedOcr {
    async fn extract_text(&self, _url: &str) -> Result<String> {
        Ok(self.0.to_string())
    }
}

fn completion(message: Value, finish: &str) -> Value {
    json!({
        "id": "upstream",
        "object": "chat.completion",
        "created": 1,
        "model": "backend-model",
        "choices": [{"index": 0, "message": message, "finish_reason": finish}]
    })
}

fn tool_call_completion(name: &str, arguments: &str) -> Value {
    completion(
        json!({
            "role": "assistant",
            "content": "",
            "tool_calls": [{
                "id": "call_1",
                "type": "function",
                "function": {"name": name, "arguments": arguments}
            }]
        }),
        "tool_calls",
    )
}

fn app_with(cfg: GatewayConfig, llm: Arc<ScriptedLlm>) -> Router {
    let tools = Arc::new(ToolDispatcher::new(&cfg).unwrap());
    router(Arc::new(AppState::with_backends(
        cfg,
        llm,
        tools,
        Arc::new(FixedOcr("个人简历\n姓名：张三\n学历：本科\n工作经验：Java开发3年")),
    )))
}

fn chat_request(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/chat/completions")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_and_index() {
    let fixture = MockServerFixture::new().await;
    let app = app_with(fixture.config(), ScriptedLlm::new(vec![]));

    let resp = app.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["status"], "ok");

    let resp = app.oneshot(get("/")).await.unwrap();
    let body = json_body(resp).await;
    assert_eq!(body["message"], "青岛岗位匹配系统 API");
    assert_eq!(body["model"], "qd-job-turbo");
    assert_eq!(body["endpoints"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn wrong_model_is_rejected() {
    let fixture = MockServerFixture::new().await;
    let app = app_with(fixture.config(), ScriptedLlm::new(vec![]));

    let resp = app
        .oneshot(chat_request(&json!({
            "model": "gpt-4o",
            "messages": [{"role": "user", "content": "你好"}]
        })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert_eq!(body["error"]["type"], "invalid_request");
    assert_eq!(body["error"]["code"], "E1001");
    assert_eq!(body["error"]["message"], "不支持的模型，请使用: qd-job-turbo");
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let fixture = MockServerFixture::new().await;
    let app = app_with(fixture.config(), ScriptedLlm::new(vec![]));

    let req = Request::builder()
        .method("POST")
        .uri("/v1/chat/completions")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("无效的请求格式"));
}

#[tokio::test]
async fn buffered_job_search_uses_real_listings() {
    let fixture = MockServerFixture::new().await;
    let jobs = fixture.mock_jobs(&[("Java开发工程师", 0)]).await;
    let llm = ScriptedLlm::new(vec![
        tool_call_completion("queryJobsByArea", r#"{"jobTitle":"Java","jobLocationAreaCode":"0"}"#),
        completion(
            json!({"role": "assistant", "content": "<think>整理结果</think>为您找到1个岗位：Java开发工程师"}),
            "stop",
        ),
    ]);
    let app = app_with(fixture.config(), llm.clone());

    let resp = app
        .oneshot(chat_request(&json!({
            "model": "qd-job-turbo",
            "messages": [{"role": "user", "content": "帮我找市南区的Java工作"}]
        })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["model"], "qd-job-turbo");
    assert_eq!(
        body["choices"][0]["message"]["content"],
        "为您找到1个岗位：Java开发工程师"
    );
    jobs.assert_async().await;

    let requests = llm.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].messages[0].role, job_chat_gateway::MessageRole::System);
    let tool_msg = requests[1].messages.last().unwrap();
    assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call_1"));
    assert!(tool_msg.text().unwrap().contains("8000-12000元/月"));
}

#[tokio::test]
async fn endless_tool_calls_end_in_500() {
    let fixture = MockServerFixture::new().await;
    let llm = ScriptedLlm::repeating(tool_call_completion("lookupWeather", "{}"));
    let app = app_with(fixture.config(), llm);

    let resp = app
        .oneshot(chat_request(&json!({
            "model": "qd-job-turbo",
            "messages": [{"role": "user", "content": "今天天气怎么样"}]
        })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(resp).await;
    assert_eq!(body["error"]["type"], "tool_loop_exhausted");
    assert_eq!(
        body["error"]["message"],
        "处理请求失败: 超过最大工具调用次数 (limit: 10)"
    );
}

#[tokio::test]
async fn uploaded_image_is_flattened_before_the_model() {
    let fixture = MockServerFixture::new().await;
    let llm = ScriptedLlm::new(vec![completion(
        json!({"role": "assistant", "content": "已收到您的简历"}),
        "stop",
    )]);
    let app = app_with(fixture.config(), llm.clone());

    let resp = app
        .oneshot(chat_request(&json!({
            "model": "qd-job-turbo",
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": "看看我的简历"},
                    {"type": "image_url", "image_url": {"url": "https://files.example/cv.png"}}
                ]
            }]
        })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let requests = llm.requests.lock().unwrap();
    let user = requests[0].messages.last().unwrap();
    let text = user.text().unwrap();
    assert!(text.contains("看看我的简历"));
    assert!(text.contains(RESUME_LABEL));
    assert!(text.contains("姓名：张三"));
}

#[tokio::test]
async fn streaming_response_is_sse_and_ends_with_done() {
    let fixture = MockServerFixture::new().await;
    let upstream = fixture
        .mock_sse_stream(
            "/v1/chat/completions",
            &[text_chunk("<think>先打招呼</think>"), text_chunk("你好！"), finish_chunk("stop")],
        )
        .await;
    let cfg = fixture.config();
    let app = router(Arc::new(AppState::from_config(cfg).unwrap()));

    let resp = app
        .oneshot(chat_request(&json!({
            "model": "qd-job-turbo",
            "stream": true,
            "messages": [{"role": "user", "content": "你好"}]
        })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::CONTENT_TYPE].to_str().unwrap(),
        "text/event-stream"
    );
    assert_eq!(resp.headers()[header::CACHE_CONTROL], "no-cache");

    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.ends_with("data: [DONE]\n\n"));
    assert!(!text.contains("先打招呼"));

    let chunks: Vec<ChatCompletionChunk> = text
        .split("\n\n")
        .filter_map(|frame| frame.strip_prefix("data: "))
        .filter(|data| *data != "[DONE]")
        .map(|data| serde_json::from_str(data).unwrap())
        .collect();
    let content: String = chunks.iter().filter_map(|c| c.content()).collect();
    assert_eq!(content, "你好！");
    assert!(chunks.iter().all(|c| c.model == "qd-job-turbo"));
    assert!(chunks.iter().all(|c| c.id == chunks[0].id));
    assert!(chunks[0].id.starts_with("chatcmpl-"));
    upstream.assert_async().await;
}

#[tokio::test]
async fn rate_limit_rejects_with_429() {
    let fixture = MockServerFixture::new().await;
    let mut cfg = fixture.config();
    cfg.rate_limit.capacity = 1;
    cfg.rate_limit.refill_per_second = 1;
    let app = app_with(cfg, ScriptedLlm::new(vec![]));

    let first = app.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = json_body(second).await;
    assert_eq!(body["error"]["message"], "请求过于频繁，请稍后再试");
    assert_eq!(body["error"]["code"], "E2001");
}

#[tokio::test]
async fn metrics_count_requests_per_endpoint() {
    let fixture = MockServerFixture::new().await;
    let app = app_with(fixture.config(), ScriptedLlm::new(vec![]));

    app.clone().oneshot(get("/health")).await.unwrap();
    app.clone()
        .oneshot(chat_request(&json!({"model": "qd-job-turbo", "messages": []})))
        .await
        .unwrap();

    let resp = app.oneshot(get("/metrics")).await.unwrap();
    let body = json_body(resp).await;
    assert_eq!(body["requests"]["failed"], 1);
    assert_eq!(body["endpoints"]["GET /health"]["count"], 1);
    assert_eq!(body["endpoints"]["POST /v1/chat/completions"]["count"], 1);
}

#[tokio::test]
async fn metrics_route_is_absent_when_disabled() {
    let fixture = MockServerFixture::new().await;
    let mut cfg = fixture.config();
    cfg.performance.enable_metrics = false;
    let app = app_with(cfg, ScriptedLlm::new(vec![]));

    let resp = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
