//! 编排模块：多轮工具调用循环、流式转发和岗位幻觉拦截。
//!
//! # Orchestrator
//!
//! Drives one conversation turn against the model:
//!
//! ```text
//! AwaitModel ─► RespondedNoTools ─► Terminal
//!     ▲
//!     └── ExecuteTools ◄─ RespondedWithTools
//! ```
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`ToolCallAssembler`] | Merges streamed tool-call fragments by index |
//! | [`TurnState`] / [`RoundState`] | Per-turn and per-round bookkeeping |
//! | [`Relay`] | Stamps and forwards chunks to the response body |
//! | [`Orchestrator`] | Buffered and streaming loops |
//!
//! At most `max_iterations` model rounds run per turn. While the user asks
//! about jobs and no job search has succeeded, model prose is held back and
//! checked for invented listings; a hit triggers a forced job search instead.

pub mod assembler;
pub mod relay;
pub mod state;

pub use assembler::ToolCallAssembler;
pub use relay::{error_chunk, Relay, RELAY_BUFFER};
pub use state::{RoundState, TurnState};

use crate::config::GatewayConfig;
use crate::guardrails::{
    contains_reasoning_markers, strip_reasoning_spans, FabricationDetector, IntentClassifier,
    INTERCEPTION_NOTICE,
};
use crate::llm::LlmBackend;
use crate::tools::{is_job_tool, JobSearchOutput, ToolError, ToolExecutor};
use crate::types::{
    ChatCompletionChunk, ChatCompletionResponse, CompletionRequest, FinishReason, Message,
    MessageContent, ToolCall, ToolChoice,
};
use crate::{BoxStream, Error, ErrorContext, Result};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const BRIDGE_TEXT: &str = "\n\n";
pub const NO_JOBS_TEXT: &str = "\n\n未找到符合条件的岗位。\n";
pub const EMPTY_TOOL_RESULT: &str = "工具执行完成";

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Model name sent to the backend.
    pub backend_model: String,
    /// Model name shown to clients.
    pub exposed_model: String,
    pub max_iterations: usize,
    pub listing_interval: Duration,
}

impl OrchestratorSettings {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            backend_model: config.llm.model.clone(),
            exposed_model: config.orchestration.exposed_model.clone(),
            max_iterations: config.orchestration.max_iterations.max(1),
            listing_interval: config.orchestration.listing_interval(),
        }
    }
}

/// Sampling knobs passed through to the backend untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SamplingParams {
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub max_tokens: Option<u32>,
}

/// A running streamed turn.
pub struct StreamingTurn {
    pub id: String,
    pub created: i64,
    pub model: String,
    /// Ends after the last chunk; an `Err` item means the worker failed.
    pub chunks: BoxStream<'static, ChatCompletionChunk>,
}

enum ToolOutcome {
    Success(String),
    Failed(String),
}

impl ToolOutcome {
    fn into_message_text(self) -> String {
        match self {
            ToolOutcome::Success(text) if text.is_empty() => EMPTY_TOOL_RESULT.to_string(),
            ToolOutcome::Success(text) => text,
            ToolOutcome::Failed(err) => format!("工具调用失败: {}", err),
        }
    }
}

pub struct Orchestrator {
    llm: Arc<dyn LlmBackend>,
    tools: Arc<dyn ToolExecutor>,
    settings: OrchestratorSettings,
    intent: IntentClassifier,
    detector: FabricationDetector,
}

impl Orchestrator {
    pub fn new(
        llm: Arc<dyn LlmBackend>,
        tools: Arc<dyn ToolExecutor>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            llm,
            tools,
            settings,
            intent: IntentClassifier::new(),
            detector: FabricationDetector::new(),
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    fn build_request(&self, state: &TurnState, params: SamplingParams) -> CompletionRequest {
        CompletionRequest {
            model: self.settings.backend_model.clone(),
            messages: state.messages.clone(),
            tools: self.tools.definitions().to_vec(),
            tool_choice: Some(state.tool_choice.clone()),
            stream: false,
            temperature: params.temperature,
            top_p: params.top_p,
            max_tokens: params.max_tokens,
        }
    }

    fn new_turn(&self, messages: Vec<Message>) -> TurnState {
        let job_intent = self.intent.has_job_intent(&messages);
        TurnState::new(messages, job_intent)
    }

    async fn run_tool(&self, call: &ToolCall, cancel: &CancellationToken) -> Result<ToolOutcome> {
        tracing::info!(tool = %call.name(), id = %call.id, "calling tool");
        let result = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            r = self.tools.execute(call.name(), call.arguments()) => r,
        };
        match result {
            Ok(text) => Ok(ToolOutcome::Success(text)),
            Err(e) if e.is_fatal() => match e {
                ToolError::Backend(inner) => Err(inner),
                other => Err(Error::protocol_with_context(
                    other.to_string(),
                    ErrorContext::new()
                        .with_field_path(format!("tool_calls.{}.arguments", call.name()))
                        .with_source("orchestrator"),
                )),
            },
            Err(e) => {
                tracing::warn!(tool = %call.name(), error = %e, "tool failed");
                Ok(ToolOutcome::Failed(e.to_string()))
            }
        }
    }

    /// Runs a whole turn and returns the final answer.
    ///
    /// `messages` must already hold the system prompt and resolved content.
    pub async fn complete(
        &self,
        messages: Vec<Message>,
        params: SamplingParams,
        cancel: &CancellationToken,
    ) -> Result<ChatCompletionResponse> {
        let mut state = self.new_turn(messages);

        for iteration in 0..self.settings.max_iterations {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let request = self.build_request(&state, params);
            let mut response = self.llm.complete(&request, cancel).await?;
            let Some(choice) = response.choices.first_mut() else {
                return Err(Error::runtime("LLM返回空结果"));
            };

            let calls: Vec<ToolCall> = choice
                .message
                .tool_calls
                .drain(..)
                .filter(ToolCall::is_complete)
                .collect();
            let text = strip_reasoning_spans(choice.message.text().unwrap_or_default());
            tracing::debug!(iteration, tools = calls.len(), "model round finished");

            if calls.is_empty() {
                if state.guard_active() && self.detector.is_fabricated(&text) {
                    tracing::warn!(iteration, "intercepted invented job listings");
                    state.force_job_tool();
                    continue;
                }
                choice.message.content = Some(MessageContent::Text(text));
                response.model = self.settings.exposed_model.clone();
                return Ok(response);
            }

            state.record_tool_calls(text, calls.clone());
            for call in &calls {
                let outcome = self.run_tool(call, cancel).await?;
                if is_job_tool(call.name()) {
                    state.tool_choice = ToolChoice::Auto;
                    if matches!(outcome, ToolOutcome::Success(_)) {
                        state.job_tool_succeeded = true;
                    }
                }
                state
                    .messages
                    .push(Message::tool(call.id.clone(), outcome.into_message_text()));
            }
        }

        Err(Error::IterationLimit {
            limit: self.settings.max_iterations,
        })
    }

    /// Starts a streamed turn on a worker task.
    ///
    /// Dropping the returned stream cancels the worker.
    pub fn stream(
        self: &Arc<Self>,
        messages: Vec<Message>,
        params: SamplingParams,
        cancel: CancellationToken,
    ) -> StreamingTurn {
        let id = format!("chatcmpl-{}", uuid::Uuid::new_v4());
        let created = chrono::Utc::now().timestamp();
        let model = self.settings.exposed_model.clone();
        let (tx, mut rx) = mpsc::channel(RELAY_BUFFER);

        let worker = Arc::clone(self);
        let mut relay = Relay::new(id.clone(), created, model.clone(), tx.clone());
        let worker_cancel = cancel.clone();
        tokio::spawn(async move {
            let state = worker.new_turn(messages);
            match worker.run_stream(state, params, &mut relay, &worker_cancel).await {
                Ok(()) => tracing::debug!(chunks = relay.sent(), "stream finished"),
                Err(Error::Cancelled) => tracing::info!("stream cancelled"),
                Err(e) => {
                    tracing::error!(error = %e, "stream failed");
                    let _ = tx.send(Err(e)).await;
                }
            }
        });

        let guard = cancel.drop_guard();
        let chunks = async_stream::stream! {
            let _guard = guard;
            while let Some(item) = rx.recv().await {
                yield item;
            }
        };

        StreamingTurn {
            id,
            created,
            model,
            chunks: Box::pin(chunks),
        }
    }

    /// Passes one chunk through the reasoning filter and relays what is left.
    async fn relay_filtered(
        &self,
        state: &mut TurnState,
        relay: &mut Relay,
        mut chunk: ChatCompletionChunk,
    ) -> Result<()> {
        let finish = chunk.finish_reason();
        let visible = chunk
            .content()
            .map(|c| state.filter.filter_fragment(c))
            .unwrap_or_default();
        if visible.is_empty() && finish.is_none() {
            return Ok(());
        }
        if let Some(choice) = chunk.choices.first_mut() {
            choice.delta.content = (!visible.is_empty()).then_some(visible);
        }
        relay.send(chunk).await
    }

    async fn run_stream(
        &self,
        mut state: TurnState,
        params: SamplingParams,
        relay: &mut Relay,
        cancel: &CancellationToken,
    ) -> Result<()> {
        for iteration in 0..self.settings.max_iterations {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let mut request = self.build_request(&state, params);
            request.stream = true;
            let mut upstream = tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                r = self.llm.complete_streaming(&request) => r?,
            };

            let guarded = state.guard_active();
            let mut round = RoundState::new();
            loop {
                let next = tokio::select! {
                    _ = cancel.cancelled() => return Err(Error::Cancelled),
                    next = upstream.next() => next,
                };
                let Some(item) = next else { break };
                let chunk = item?;
                let had_fragments = round.has_tool_fragments();
                round.observe(&chunk);

                // Prose before the first tool fragment is no longer suspect.
                if guarded && !had_fragments && round.has_tool_fragments() {
                    for held in std::mem::take(&mut round.pending) {
                        self.relay_filtered(&mut state, relay, held).await?;
                    }
                }
                if !chunk.is_forwardable() {
                    continue;
                }
                if guarded && !round.has_tool_fragments() {
                    round.pending.push(chunk);
                } else {
                    self.relay_filtered(&mut state, relay, chunk).await?;
                }
            }

            let had_fragments = round.has_tool_fragments();
            let visible_text = strip_reasoning_spans(&round.raw_text);
            tracing::debug!(
                iteration,
                chunks = round.pending.len(),
                tool_fragments = had_fragments,
                "model round finished"
            );

            if guarded && !had_fragments {
                if self.detector.is_fabricated(&visible_text) {
                    tracing::warn!(iteration, "intercepted invented job listings");
                    if !state.notice_sent {
                        relay.send_text(INTERCEPTION_NOTICE).await?;
                        state.notice_sent = true;
                    }
                    state.force_job_tool();
                    continue;
                }
                if contains_reasoning_markers(&round.raw_text) {
                    let finish = round.finish_reason.clone().unwrap_or(FinishReason::Stop);
                    if visible_text.is_empty() {
                        relay.finish(finish).await?;
                    } else {
                        let mut chunk = ChatCompletionChunk::text(visible_text.clone());
                        if let Some(choice) = chunk.choices.first_mut() {
                            choice.finish_reason = Some(finish);
                        }
                        relay.send(chunk).await?;
                    }
                } else {
                    for held in std::mem::take(&mut round.pending) {
                        self.relay_filtered(&mut state, relay, held).await?;
                    }
                }
            }

            let calls = round.assembler.finalize();
            if calls.is_empty() {
                if had_fragments {
                    relay.finish(FinishReason::Stop).await?;
                }
                return Ok(());
            }

            state.record_tool_calls(visible_text, calls.clone());
            for call in &calls {
                let outcome = self.run_tool(call, cancel).await?;
                if is_job_tool(call.name()) {
                    state.tool_choice = ToolChoice::Auto;
                    if let ToolOutcome::Success(text) = &outcome {
                        state.job_tool_succeeded = true;
                        match serde_json::from_str::<JobSearchOutput>(text) {
                            Ok(output) => {
                                return self.stream_listings(&output, relay, cancel).await;
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "job result is not a listing; passing it to the model")
                            }
                        }
                    }
                }
                state
                    .messages
                    .push(Message::tool(call.id.clone(), outcome.into_message_text()));
            }
            relay.send_text(BRIDGE_TEXT).await?;
        }

        Err(Error::IterationLimit {
            limit: self.settings.max_iterations,
        })
    }

    async fn stream_listings(
        &self,
        output: &JobSearchOutput,
        relay: &mut Relay,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let total = output.job_listings.len();
        if total == 0 {
            relay.send_text(NO_JOBS_TEXT).await?;
            return relay.finish(FinishReason::Stop).await;
        }

        relay
            .send_text(format!("\n\n为您找到 {} 个相关岗位：\n\n", total))
            .await?;
        for (i, job) in output.job_listings.iter().enumerate() {
            if i > 0 && !self.settings.listing_interval.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(Error::Cancelled),
                    _ = tokio::time::sleep(self.settings.listing_interval) => {}
                }
            }
            let body = serde_json::to_string_pretty(job)?;
            relay
                .send_text(format!("``` job-json\n{}\n```\n\n", body))
                .await?;
        }
        tracing::info!(listings = total, "job listings streamed");
        relay.finish(FinishReason::Stop).await
    }
}
