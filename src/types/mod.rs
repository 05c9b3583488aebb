//! 类型模块：定义 OpenAI 兼容的对话消息、工具调用和流式分块类型。
//!
//! # Types Module
//!
//! Strongly-typed representations of the OpenAI chat-completion wire format,
//! shared by the HTTP surface, the LLM client and the orchestrator.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Message`] | Chat message with role, content and optional tool calls |
//! | [`MessageContent`] | Plain text or a list of `text` / `image_url` parts |
//! | [`ToolCall`] | Function call from the model (also used for stream fragments) |
//! | [`ToolDefinition`] | Tool definition advertised to the model |
//! | [`ChatRequest`] | Inbound client request |
//! | [`CompletionRequest`] | Outbound backend request |
//! | [`ChatCompletionChunk`] | One streamed `chat.completion.chunk` |
//!
//! ## Example
//!
//! ```rust
//! use job_chat_gateway::types::{Message, ToolDefinition};
//!
//! let user = Message::user("青岛有哪些Java岗位？");
//! let tool = ToolDefinition::function(
//!     "queryLocation",
//!     "查询地点经纬度",
//!     serde_json::json!({
//!         "type": "object",
//!         "properties": {"keywords": {"type": "string"}},
//!         "required": ["keywords"]
//!     }),
//! );
//! assert_eq!(tool.name(), "queryLocation");
//! assert_eq!(user.text(), Some("青岛有哪些Java岗位？"));
//! ```

pub mod chat;
pub mod message;
pub mod tool;

pub use chat::{
    ChatCompletionChunk, ChatCompletionResponse, ChatRequest, Choice, ChunkChoice,
    CompletionRequest, Delta, FinishReason, Usage,
};
pub use message::{ContentPart, ImageUrl, Message, MessageContent, MessageRole};
pub use tool::{FunctionCall, FunctionDefinition, ToolCall, ToolChoice, ToolDefinition};

/// Treats an explicit JSON `null` as the type's default.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + serde::Deserialize<'de>,
{
    use serde::Deserialize;
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
