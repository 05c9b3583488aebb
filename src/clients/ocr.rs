//! OCR service for uploaded images and PDFs.

use crate::config::OcrConfig;
use crate::resilience::RetryPolicy;
use crate::transport::http::read_json;
use crate::transport::HttpTransport;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use serde::Deserialize;

/// Turns a file URL into its text.
#[async_trait]
pub trait ImageTextExtractor: Send + Sync {
    async fn extract_text(&self, url: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    data: String,
    #[serde(default)]
    cost_time_ms: Option<f64>,
    #[serde(default)]
    msg: String,
}

#[derive(Debug, Clone)]
pub struct OcrClient {
    transport: HttpTransport,
    retry: RetryPolicy,
}

impl OcrClient {
    pub fn new(config: &OcrConfig) -> Result<Self> {
        Ok(Self {
            transport: HttpTransport::new("ocr", &config.base_url, config.timeout())?,
            retry: config.retry.clone(),
        })
    }
}

#[async_trait]
impl ImageTextExtractor for OcrClient {
    async fn extract_text(&self, url: &str) -> Result<String> {
        let body = serde_json::json!({ "url": url });
        let transport = &self.transport;
        let body = &body;
        let resp: OcrResponse = self
            .retry
            .run("ocr.url", None, move || async move {
                let resp = transport.post_json("/ocr/url", body).await?;
                read_json(resp).await
            })
            .await?;

        if resp.code != 200 {
            let msg = if resp.msg.is_empty() {
                "OCR解析失败".to_string()
            } else {
                resp.msg
            };
            return Err(Error::runtime_with_context(
                msg,
                ErrorContext::new().with_source("ocr"),
            ));
        }

        tracing::debug!(
            chars = resp.data.chars().count(),
            cost_ms = resp.cost_time_ms.unwrap_or_default(),
            "ocr finished"
        );
        Ok(resp.data)
    }
}
