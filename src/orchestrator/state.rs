use super::assembler::ToolCallAssembler;
use crate::guardrails::{ReasoningFilter, CORRECTIVE_MESSAGE};
use crate::tools::names;
use crate::types::{ChatCompletionChunk, FinishReason, Message, ToolCall, ToolChoice};

/// Everything one conversation turn accumulates. Never shared between requests.
#[derive(Debug)]
pub struct TurnState {
    pub messages: Vec<Message>,
    pub tool_choice: ToolChoice,
    /// The last user message asked about jobs.
    pub job_intent: bool,
    pub job_tool_succeeded: bool,
    pub notice_sent: bool,
    pub filter: ReasoningFilter,
}

impl TurnState {
    pub fn new(messages: Vec<Message>, job_intent: bool) -> Self {
        Self {
            messages,
            tool_choice: ToolChoice::Auto,
            job_intent,
            job_tool_succeeded: false,
            notice_sent: false,
            filter: ReasoningFilter::new(),
        }
    }

    /// Model prose is checked for invented listings until real data has been fetched.
    pub fn guard_active(&self) -> bool {
        self.job_intent && !self.job_tool_succeeded
    }

    /// Appends the corrective instruction and forces the area job search.
    pub fn force_job_tool(&mut self) {
        self.messages.push(Message::user(CORRECTIVE_MESSAGE));
        self.tool_choice = ToolChoice::Function(names::QUERY_JOBS_BY_AREA.to_string());
    }

    pub fn record_tool_calls(&mut self, text: String, calls: Vec<ToolCall>) {
        self.messages.push(Message::assistant_with_calls(text, calls));
    }
}

/// What one streamed model round produced.
#[derive(Debug, Default)]
pub struct RoundState {
    pub assembler: ToolCallAssembler,
    /// Unfiltered content of the round.
    pub raw_text: String,
    /// Forwardable chunks held back while the guard is active.
    pub pending: Vec<ChatCompletionChunk>,
    pub finish_reason: Option<FinishReason>,
}

impl RoundState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, chunk: &ChatCompletionChunk) {
        let Some(choice) = chunk.first_choice() else {
            return;
        };
        if let Some(content) = choice.delta.content.as_deref() {
            self.raw_text.push_str(content);
        }
        self.assembler.extend(&choice.delta.tool_calls);
        if let Some(reason) = &choice.finish_reason {
            self.finish_reason = Some(reason.clone());
        }
    }

    pub fn has_tool_fragments(&self) -> bool {
        self.assembler.has_fragments()
    }
}
