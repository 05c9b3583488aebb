//! Flattens multi-part user content into plain text before orchestration.
//!
//! Images are sent through OCR. Text that looks like a resume is labelled as
//! such; anything else carries a hint telling the model to ask the user what the
//! image is for.

use crate::clients::ImageTextExtractor;
use crate::guardrails::{IntentClassifier, NON_RESUME_IMAGE_HINT};
use crate::types::{ContentPart, Message, MessageContent};
use std::sync::Arc;

pub const RESUME_LABEL: &str = "[用户上传的简历内容]";

const NON_RESUME_NOTE: &str = "[重要提示]: 该图片内容不像标准简历，请先询问用户上传这张图片的意图是什么，确认用户需求后再提供相应帮助。不要直接假设用户想找工作。";

pub struct ContentResolver {
    ocr: Arc<dyn ImageTextExtractor>,
    classifier: IntentClassifier,
}

impl ContentResolver {
    pub fn new(ocr: Arc<dyn ImageTextExtractor>) -> Self {
        Self {
            ocr,
            classifier: IntentClassifier::new(),
        }
    }

    /// Prepends `system_prompt` and resolves every message in order.
    pub async fn prepare(&self, system_prompt: &str, messages: &[Message]) -> Vec<Message> {
        let mut out = Vec::with_capacity(messages.len() + 1);
        out.push(Message::system(system_prompt));
        for msg in messages {
            out.push(self.resolve(msg).await);
        }
        out
    }

    /// Plain-text messages pass through unchanged.
    pub async fn resolve(&self, msg: &Message) -> Message {
        let Some(MessageContent::Parts(parts)) = &msg.content else {
            return msg.clone();
        };

        let mut texts = Vec::new();
        let mut images = Vec::new();
        for part in parts {
            match part {
                ContentPart::Text { text } => texts.push(text.as_str()),
                ContentPart::ImageUrl { image_url } if !image_url.url.is_empty() => {
                    images.push(self.describe_image(&image_url.url).await);
                }
                ContentPart::ImageUrl { .. } => {}
            }
        }

        let mut sections = Vec::with_capacity(2);
        if !texts.is_empty() {
            sections.push(texts.join("\n"));
        }
        if !images.is_empty() {
            sections.push(images.join("\n\n"));
        }

        Message {
            role: msg.role,
            content: Some(MessageContent::Text(sections.join("\n\n"))),
            name: msg.name.clone(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    async fn describe_image(&self, url: &str) -> String {
        tracing::info!(url, "running OCR on uploaded file");
        match self.ocr.extract_text(url).await {
            Ok(text) if self.classifier.is_resume(&text) => {
                format!("{}:\n{}", RESUME_LABEL, text)
            }
            Ok(text) => {
                tracing::info!(chars = text.chars().count(), "uploaded image is not a resume");
                format!("{}:\n{}\n\n{}", NON_RESUME_IMAGE_HINT, text, NON_RESUME_NOTE)
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "OCR failed");
                format!("[图片解析失败: {}]", e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageRole;
    use crate::{Error, Result};
    use async_trait::async_trait;

    struct FixedOcr;

    #[async_trait]
    impl ImageTextExtractor for FixedOcr {
        async fn extract_text(&self, url: &str) -> Result<String> {
            match url {
                "resume" => Ok("姓名：张三\n学历：本科\n技能：Java".to_string()),
                "poster" => Ok("周末音乐节".to_string()),
                _ => Err(Error::runtime("timeout")),
            }
        }
    }

    fn resolver() -> ContentResolver {
        ContentResolver::new(Arc::new(FixedOcr))
    }

    #[tokio::test]
    async fn text_and_resume_are_merged() {
        let msg = Message::with_content(
            MessageRole::User,
            MessageContent::parts(vec![
                ContentPart::text("帮我看看"),
                ContentPart::text("适合什么岗位"),
                ContentPart::image_url("resume"),
            ]),
        );
        let out = resolver().resolve(&msg).await;
        assert_eq!(
            out.text(),
            Some("帮我看看\n适合什么岗位\n\n[用户上传的简历内容]:\n姓名：张三\n学历：本科\n技能：Java")
        );
        assert_eq!(out.role, MessageRole::User);
    }

    #[tokio::test]
    async fn non_resume_and_failures_are_labelled() {
        let msg = Message::with_content(
            MessageRole::User,
            MessageContent::parts(vec![ContentPart::image_url("poster"), ContentPart::image_url("bad")]),
        );
        let out = resolver().resolve(&msg).await;
        let text = out.text().unwrap();
        assert!(text.starts_with("[用户上传的图片内容（非简历格式）]:\n周末音乐节\n\n[重要提示]"));
        assert!(text.ends_with("[图片解析失败: Runtime error: timeout]"));
    }

    #[tokio::test]
    async fn prepare_prepends_system_prompt() {
        let out = resolver().prepare("SYS", &[Message::user("你好")]).await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].role, MessageRole::System);
        assert_eq!(out[1].text(), Some("你好"));
    }
}
