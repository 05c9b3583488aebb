use crate::error_code::StandardErrorCode;
use crate::transport::TransportError;
use crate::{BoxStream, Error, Result};
use bytes::Bytes;
use futures::TryStreamExt;
use reqwest::Proxy;
use serde::Serialize;
use std::env;
use std::time::Duration;

/// Longest slice of an error body kept in `Error::Remote`.
const MAX_ERROR_BODY: usize = 512;

/// A pooled HTTP client bound to one remote service.
///
/// Each collaborator (LLM, Amap, job API, OCR, policy) owns one of these so that
/// timeouts and connection pools are isolated per service.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    service: String,
    base_url: String,
    api_key: Option<String>,
}

impl HttpTransport {
    pub fn new(service: &str, base_url: &str, timeout: Duration) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(
                env::var("GATEWAY_HTTP_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(100),
            )
            .pool_idle_timeout(Some(Duration::from_secs(
                env::var("GATEWAY_HTTP_POOL_IDLE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(90),
            )))
            .connect_timeout(Duration::from_secs(10))
            .http2_adaptive_window(true)
            .http2_keep_alive_interval(Some(Duration::from_secs(30)))
            .http2_keep_alive_timeout(Duration::from_secs(10));

        if let Ok(proxy_url) = env::var("GATEWAY_PROXY_URL") {
            if let Ok(proxy) = Proxy::all(&proxy_url) {
                builder = builder.proxy(proxy);
            }
        }

        let client = builder
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self {
            client,
            service: service.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
        })
    }

    /// Sends `Authorization: Bearer <key>` on every request.
    pub fn with_bearer(mut self, api_key: impl Into<String>) -> Self {
        let key = api_key.into();
        self.api_key = (!key.is_empty()).then_some(key);
        self
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn url(&self, path: &str) -> String {
        if path.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    /// POSTs a JSON body and returns the response after a status check.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response> {
        let req = self.authorize(self.client.post(self.url(path)).json(body));
        let resp = req
            .send()
            .await
            .map_err(|e| Error::Transport(TransportError::Http(e)))?;
        self.check_status(resp).await
    }

    /// GETs `path` with query parameters and returns the response after a status check.
    pub async fn get_query(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<reqwest::Response> {
        let req = self.authorize(self.client.get(self.url(path)).query(query));
        let resp = req
            .send()
            .await
            .map_err(|e| Error::Transport(TransportError::Http(e)))?;
        self.check_status(resp).await
    }

    /// POSTs a JSON body asking for an event stream and returns the raw body bytes.
    pub async fn post_event_stream<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<BoxStream<'static, Bytes>> {
        let req = self
            .authorize(self.client.post(self.url(path)).json(body))
            .header(reqwest::header::ACCEPT, "text/event-stream");
        let resp = req
            .send()
            .await
            .map_err(|e| Error::Transport(TransportError::Http(e)))?;
        let resp = self.check_status(resp).await?;

        let byte_stream = resp
            .bytes_stream()
            .map_err(|e| Error::Transport(TransportError::Http(e)));
        Ok(Box::pin(byte_stream))
    }

    /// Turns a non-2xx answer into `Error::Remote`, keeping a prefix of the body.
    async fn check_status(&self, resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        let message: String = body.chars().take(MAX_ERROR_BODY).collect();
        Err(Error::Remote {
            service: self.service.clone(),
            status: status.as_u16(),
            message,
            retryable: StandardErrorCode::from_http_status(status.as_u16()).retryable(),
        })
    }
}

/// Reads a response body as JSON, mapping failures onto the gateway error.
pub async fn read_json<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| Error::Transport(TransportError::Http(e)))?;
    Ok(serde_json::from_slice(&bytes)?)
}
