use crate::types::{ChatCompletionChunk, Delta, FinishReason, MessageRole};
use crate::{Error, Result};
use tokio::sync::mpsc;

/// Capacity of the worker-to-handler channel.
pub const RELAY_BUFFER: usize = 64;

/// Stamps turn metadata on chunks and hands them to the response body.
///
/// Only the first chunk of a turn carries `role: assistant`.
pub struct Relay {
    id: String,
    created: i64,
    model: String,
    tx: mpsc::Sender<Result<ChatCompletionChunk>>,
    role_sent: bool,
    sent: usize,
}

impl Relay {
    pub fn new(
        id: impl Into<String>,
        created: i64,
        model: impl Into<String>,
        tx: mpsc::Sender<Result<ChatCompletionChunk>>,
    ) -> Self {
        Self {
            id: id.into(),
            created,
            model: model.into(),
            tx,
            role_sent: false,
            sent: 0,
        }
    }

    pub fn sent(&self) -> usize {
        self.sent
    }

    /// Fails with `Error::Cancelled` once the receiving side is gone.
    pub async fn send(&mut self, mut chunk: ChatCompletionChunk) -> Result<()> {
        chunk.id = self.id.clone();
        chunk.created = self.created;
        chunk.model = self.model.clone();
        if let Some(choice) = chunk.choices.first_mut() {
            choice.delta.role = (!self.role_sent).then_some(MessageRole::Assistant);
            choice.delta.tool_calls.clear();
        }
        self.role_sent = true;
        self.tx.send(Ok(chunk)).await.map_err(|_| Error::Cancelled)?;
        self.sent += 1;
        Ok(())
    }

    pub async fn send_text(&mut self, content: impl Into<String>) -> Result<()> {
        self.send(ChatCompletionChunk::text(content)).await
    }

    /// Empty delta with a finish reason.
    pub async fn finish(&mut self, reason: FinishReason) -> Result<()> {
        self.send(ChatCompletionChunk::from_delta(Delta::default(), Some(reason)))
            .await
    }
}

/// Chunk sent in place of the stream when the worker fails.
pub fn error_chunk(id: &str, created: i64, model: &str, err: &Error) -> ChatCompletionChunk {
    let mut chunk = ChatCompletionChunk::from_delta(
        Delta {
            role: Some(MessageRole::Assistant),
            content: Some(format!("\n\n错误：{}", err)),
            tool_calls: Vec::new(),
        },
        Some(FinishReason::Error),
    );
    chunk.id = id.to_string();
    chunk.created = created;
    chunk.model = model.to_string();
    chunk
}
