//! Mock HTTP server setup for integration tests
#![allow(dead_code)]

use job_chat_gateway::config::GatewayConfig;
use mockito::{Matcher, Mock, Server, ServerGuard};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Test fixture that manages a mock server standing in for every collaborator:
///
/// | Service | Mount |
/// |---------|-------|
/// | LLM | `/v1/chat/completions` |
/// | Amap | `/amap/place/text` |
/// | Job API | `/jobs` |
/// | OCR | `/ocr/url` |
/// | Policy | `/api/aiServer/...` |
pub struct MockServerFixture {
    pub server: Arc<Mutex<ServerGuard>>,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self {
            server: Arc::new(Mutex::new(server)),
            base_url,
        }
    }

    /// Gateway config pointing every collaborator at the mock server, with
    /// millisecond retry delays and no listing pacing.
    pub fn config(&self) -> GatewayConfig {
        let yaml = format!(
            r#"
llm:
  base_url: "{base}/v1"
  api_key: "sk-test"
  model: "backend-model"
  retry: {{ max_attempts: 3, base_delay_ms: 1, max_delay_ms: 5, backoff: linear }}
amap:
  base_url: "{base}/amap"
  api_key: "amap-key"
  retry: {{ max_attempts: 1, base_delay_ms: 1, max_delay_ms: 1, backoff: linear }}
job_api:
  base_url: "{base}/jobs"
  retry: {{ max_attempts: 1, base_delay_ms: 1, max_delay_ms: 1, backoff: linear }}
ocr:
  base_url: "{base}"
policy:
  base_url: "{base}"
  login_name: "gateway"
  user_key: "secret"
  service_id: "svc-1"
  retry: {{ max_attempts: 1, base_delay_ms: 1, max_delay_ms: 1, backoff: linear }}
orchestration:
  listing_interval_ms: 0
"#,
            base = self.base_url
        );
        GatewayConfig::from_yaml_str(&yaml).expect("fixture config parses")
    }

    /// Frames `chunks` as `data:` events and appends `[DONE]`.
    pub fn sse_body(chunks: &[serde_json::Value]) -> String {
        let mut body: String = chunks
            .iter()
            .map(|c| format!("data: {}\n\n", c))
            .collect();
        body.push_str("data: [DONE]\n\n");
        body
    }

    /// Create a mock for a successful streaming response (SSE)
    pub async fn mock_sse_stream(&self, path: &str, chunks: &[serde_json::Value]) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("POST", path)
            .match_header("accept", "text/event-stream")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(Self::sse_body(chunks))
            .create_async()
            .await
    }

    /// Create a mock for a JSON response
    pub async fn mock_json_response(
        &self,
        method: &str,
        path: &str,
        status: u16,
        body: &serde_json::Value,
    ) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock(method, path)
            .match_query(Matcher::Any)
            .with_status(status.into())
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await
    }

    /// Job API answer with the given `(title, areaCode)` rows.
    pub async fn mock_jobs(&self, rows: &[(&str, i64)]) -> Mock {
        let rows: Vec<serde_json::Value> = rows
            .iter()
            .map(|(title, area)| {
                serde_json::json!({
                    "jobTitle": title,
                    "companyName": "青岛软件科技有限公司",
                    "minSalary": 8000,
                    "maxSalary": 12000,
                    "education": "4",
                    "experience": 3,
                    "appJobUrl": format!("https://jobs.example/{}", title),
                    "jobLocationAreaCode": area,
                })
            })
            .collect();
        self.mock_json_response(
            "GET",
            "/jobs",
            200,
            &serde_json::json!({"code": 200, "msg": "ok", "rows": rows, "data": null}),
        )
        .await
    }
}

/// A one-choice `chat.completion.chunk` carrying text.
pub fn text_chunk(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "upstream-1",
        "object": "chat.completion.chunk",
        "created": 1,
        "model": "backend-model",
        "choices": [{"index": 0, "delta": {"content": content}, "finish_reason": null}]
    })
}

pub fn finish_chunk(reason: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "upstream-1",
        "object": "chat.completion.chunk",
        "created": 1,
        "model": "backend-model",
        "choices": [{"index": 0, "delta": {}, "finish_reason": reason}]
    })
}
