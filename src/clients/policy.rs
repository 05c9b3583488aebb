//! Policy consultation service with a cached access ticket.

use crate::config::PolicyConfig;
use crate::resilience::RetryPolicy;
use crate::transport::http::read_json;
use crate::transport::HttpTransport;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

pub const TICKET_TTL: Duration = Duration::from_secs(60 * 60);
/// Tickets this close to expiry are refreshed before use.
pub const TICKET_REFRESH_MARGIN: Duration = Duration::from_secs(5 * 60);

const TICKET_PATH: &str = "/api/aiServer/getAccessUserInfo";
const CHAT_PATH: &str = "/api/aiServer/aichat/stream-ai";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PolicyTicket {
    #[serde(default)]
    pub appid: String,
    #[serde(default, rename = "privateKey")]
    pub private_key: String,
    #[serde(default, rename = "sm4Key")]
    pub sm4_key: String,
    #[serde(default)]
    pub ticket: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default = "Option::default")]
    data: Option<T>,
}

/// One consultation turn. Identity fields are only sent for real-name requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub stream: bool,
    pub real_name: bool,
    pub message: String,
    pub meg_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aac001: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aac147: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aac003: Option<String>,
    #[serde(rename = "reqtype")]
    pub req_type: String,
}

impl PolicyQuery {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            meg_type: "1".to_string(),
            req_type: "1".to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyAnswer {
    pub chat_id: String,
    pub message: String,
    pub conversation_id: String,
    #[serde(skip_serializing)]
    pub meg_type: String,
}

#[derive(Debug)]
struct CachedTicket {
    ticket: PolicyTicket,
    expires_at: Instant,
}

impl CachedTicket {
    fn is_fresh(&self, now: Instant) -> bool {
        now + TICKET_REFRESH_MARGIN < self.expires_at
    }
}

#[derive(Debug)]
pub struct PolicyClient {
    transport: HttpTransport,
    login_name: String,
    user_key: String,
    service_id: String,
    retry: RetryPolicy,
    ticket: RwLock<Option<CachedTicket>>,
}

impl PolicyClient {
    pub fn new(config: &PolicyConfig) -> Result<Self> {
        Ok(Self {
            transport: HttpTransport::new("policy", &config.base_url, config.timeout())?,
            login_name: config.login_name.clone(),
            user_key: config.user_key.clone(),
            service_id: config.service_id.clone(),
            retry: config.retry.clone(),
            ticket: RwLock::new(None),
        })
    }

    /// Returns the cached ticket, fetching a new one when missing or near expiry.
    pub async fn ticket(&self) -> Result<PolicyTicket> {
        {
            let guard = self.ticket.read().await;
            if let Some(cached) = guard.as_ref().filter(|c| c.is_fresh(Instant::now())) {
                return Ok(cached.ticket.clone());
            }
        }

        let mut guard = self.ticket.write().await;
        if let Some(cached) = guard.as_ref().filter(|c| c.is_fresh(Instant::now())) {
            return Ok(cached.ticket.clone());
        }

        let ticket = self.fetch_ticket().await?;
        tracing::info!(appid = %ticket.appid, "policy ticket refreshed");
        *guard = Some(CachedTicket {
            ticket: ticket.clone(),
            expires_at: Instant::now() + TICKET_TTL,
        });
        Ok(ticket)
    }

    async fn fetch_ticket(&self) -> Result<PolicyTicket> {
        let body = serde_json::json!({
            "loginname": self.login_name,
            "userkey": self.user_key,
        });
        let transport = &self.transport;
        let body = &body;
        let envelope: Envelope<PolicyTicket> = self
            .retry
            .run("policy.ticket", None, move || async move {
                let resp = transport.post_json(TICKET_PATH, body).await?;
                read_json(resp).await
            })
            .await?;

        if envelope.code != 200 {
            return Err(policy_error(format!("获取ticket失败: {}", envelope.message)));
        }
        envelope
            .data
            .ok_or_else(|| policy_error("获取ticket失败: 返回数据为空"))
    }

    pub async fn chat(&self, query: &PolicyQuery) -> Result<PolicyAnswer> {
        let ticket = self.ticket().await?;
        let body = serde_json::json!({
            "appid": ticket.appid,
            "ticket": ticket.ticket,
            "data": query,
        });
        let path = format!("{}/{}", CHAT_PATH, self.service_id);
        let transport = &self.transport;
        let (path, body) = (path.as_str(), &body);
        let envelope: Envelope<PolicyAnswer> = self
            .retry
            .run("policy.chat", None, move || async move {
                let resp = transport.post_json(path, body).await?;
                read_json(resp).await
            })
            .await?;

        if envelope.code != 200 {
            return Err(policy_error(format!("对话请求失败: {}", envelope.message)));
        }
        Ok(envelope.data.unwrap_or_default())
    }
}

fn policy_error(message: impl Into<String>) -> Error {
    Error::runtime_with_context(message, ErrorContext::new().with_source("policy"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_near_expiry_is_stale() {
        let now = Instant::now();
        let fresh = CachedTicket {
            ticket: PolicyTicket::default(),
            expires_at: now + Duration::from_secs(30 * 60),
        };
        let stale = CachedTicket {
            ticket: PolicyTicket::default(),
            expires_at: now + Duration::from_secs(4 * 60),
        };
        assert!(fresh.is_fresh(now));
        assert!(!stale.is_fresh(now));
    }

    #[test]
    fn query_omits_identity_when_anonymous() {
        let v = serde_json::to_value(PolicyQuery::new("大学生就业补贴")).unwrap();
        assert_eq!(v["message"], "大学生就业补贴");
        assert_eq!(v["reqtype"], "1");
        assert_eq!(v["realName"], false);
        assert!(v.get("aac001").is_none());
        assert!(v.get("chatId").is_none());
    }
}
