//! 大模型后端模块：OpenAI 兼容的补全接口（普通与流式）。
//!
//! # LLM Backend
//!
//! The orchestrator talks to the model only through [`LlmBackend`], so tests can
//! swap in scripted backends.
//!
//! | Call | Retries | Transport |
//! |------|---------|-----------|
//! | [`LlmBackend::complete`] | per `llm.retry` | `POST {base}/chat/completions` |
//! | [`LlmBackend::complete_streaming`] | none | same, `Accept: text/event-stream` |

use crate::config::LlmConfig;
use crate::resilience::RetryPolicy;
use crate::transport::http::read_json;
use crate::transport::{HttpTransport, SseDecoder};
use crate::types::{ChatCompletionChunk, ChatCompletionResponse, CompletionRequest};
use crate::{BoxStream, Result};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

const COMPLETIONS_PATH: &str = "/chat/completions";

#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Buffered completion.
    async fn complete(
        &self,
        request: &CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatCompletionResponse>;

    /// Streaming completion. The request is sent with `stream: true`.
    async fn complete_streaming(
        &self,
        request: &CompletionRequest,
    ) -> Result<BoxStream<'static, ChatCompletionChunk>>;
}

/// HTTP client for an OpenAI-compatible backend.
#[derive(Debug, Clone)]
pub struct LlmClient {
    transport: HttpTransport,
    retry: RetryPolicy,
    decoder: SseDecoder,
}

impl LlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let transport = HttpTransport::new("llm", &config.base_url, config.timeout())?
            .with_bearer(config.api_key.clone());
        Ok(Self {
            transport,
            retry: config.retry_policy(),
            decoder: SseDecoder::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl LlmBackend for LlmClient {
    async fn complete(
        &self,
        request: &CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatCompletionResponse> {
        let mut body = request.clone();
        body.stream = false;
        tracing::debug!(
            messages = body.messages.len(),
            tools = body.tools.len(),
            "sending completion request"
        );
        let transport = &self.transport;
        let body = &body;
        self.retry
            .run("llm.complete", Some(cancel), move || async move {
                let resp = transport.post_json(COMPLETIONS_PATH, body).await?;
                read_json::<ChatCompletionResponse>(resp).await
            })
            .await
    }

    async fn complete_streaming(
        &self,
        request: &CompletionRequest,
    ) -> Result<BoxStream<'static, ChatCompletionChunk>> {
        let mut body = request.clone();
        body.stream = true;
        tracing::debug!(
            messages = body.messages.len(),
            tools = body.tools.len(),
            "opening completion stream"
        );
        let bytes = self
            .transport
            .post_event_stream(COMPLETIONS_PATH, &body)
            .await?;
        Ok(self.decoder.decode(bytes))
    }
}
