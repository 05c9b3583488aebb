//! 配置模块：从 YAML 文件加载网关配置，并支持环境变量覆盖。
//!
//! # Configuration
//!
//! The gateway is configured from one YAML file. The path comes from
//! `--config <path>`, else `GATEWAY_CONFIG`, else `config.yaml`.
//!
//! Loading happens in three steps:
//!
//! 1. parse the YAML (every section and field is optional);
//! 2. apply environment overrides (`LLM_API_KEY`, `LLM_BASE_URL`, `AMAP_API_KEY`,
//!    `OCR_BASE_URL`, `SERVER_PORT`);
//! 3. fill remaining empty values with defaults and validate.
//!
//! ## Example
//!
//! ```rust
//! use job_chat_gateway::config::GatewayConfig;
//!
//! let cfg = GatewayConfig::from_yaml_str(
//!     r#"
//! llm:
//!   base_url: "http://localhost:8000/v1"
//!   model: "qwen3-32b"
//! "#,
//! )
//! .unwrap();
//! assert_eq!(cfg.server.port, 8080);
//! assert_eq!(cfg.city.name, "青岛");
//! assert_eq!(cfg.orchestration.exposed_model, "qd-job-turbo");
//! ```

use crate::resilience::retry::{Backoff, RetryPolicy};
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";
pub const CONFIG_PATH_ENV: &str = "GATEWAY_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub city: CityConfig,
    pub llm: LlmConfig,
    pub amap: AmapConfig,
    pub job_api: JobApiConfig,
    pub ocr: OcrConfig,
    pub policy: PolicyConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub rate_limit: RateLimitConfig,
    pub orchestration: OrchestrationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// City-specific vocabulary used in tool descriptions and the system prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CityConfig {
    pub name: String,
    pub system_name: String,
    /// District name -> area code.
    pub area_codes: BTreeMap<String, String>,
    pub landmarks: Vec<String>,
    /// Abbreviation -> full name.
    pub abbreviations: BTreeMap<String, String>,
}

impl CityConfig {
    fn fill_defaults(&mut self) {
        if self.name.is_empty() {
            self.name = "青岛".to_string();
        }
        if self.system_name.is_empty() {
            self.system_name = format!("{}岗位匹配系统", self.name);
        }
        if self.area_codes.is_empty() {
            self.area_codes = [
                ("市南区", "0"),
                ("市北区", "1"),
                ("李沧区", "2"),
                ("崂山区", "3"),
                ("黄岛区", "4"),
                ("城阳区", "5"),
                ("即墨区", "6"),
                ("胶州市", "7"),
                ("平度市", "8"),
                ("莱西市", "9"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        }
        if self.landmarks.is_empty() {
            self.landmarks = vec!["五四广场".to_string(), "青岛啤酒博物馆".to_string()];
        }
        if self.abbreviations.is_empty() {
            self.abbreviations.insert("青啤".to_string(), "青岛啤酒".to_string());
        }
    }

    /// `市南区(0), 市北区(1), ...` ordered by numeric code.
    pub fn area_codes_description(&self) -> String {
        let mut pairs: Vec<(&String, &String)> = self.area_codes.iter().collect();
        pairs.sort_by_key(|(name, code)| (code.parse::<i64>().unwrap_or(i64::MAX), *code, *name));
        pairs
            .iter()
            .map(|(name, code)| format!("{}({})", name, code))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn landmarks_example(&self) -> String {
        self.landmarks.join("、")
    }

    pub fn abbreviations_description(&self) -> String {
        self.abbreviations
            .iter()
            .map(|(abbr, full)| format!("\"{}\"指\"{}\"", abbr, full))
            .collect::<Vec<_>>()
            .join("、")
    }

    /// Reverse lookup of a district name by area code.
    pub fn area_name(&self, code: &str) -> Option<&str> {
        self.area_codes
            .iter()
            .find(|(_, c)| c.as_str() == code)
            .map(|(name, _)| name.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
    /// Legacy knob; when set it overrides `retry.max_attempts`.
    pub max_retries: Option<u32>,
    pub retry: RetryPolicy,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            model: String::new(),
            timeout_secs: 120,
            max_retries: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Effective retry policy for buffered completions.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self.max_retries {
            Some(n) if n > 0 => self.retry.clone().with_max_attempts(n),
            _ => self.retry.clone(),
        }
    }
}

fn lookup_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 2,
        base_delay_ms: 500,
        max_delay_ms: 5_000,
        backoff: Backoff::Exponential,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AmapConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
    pub retry: RetryPolicy,
}

impl AmapConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for AmapConfig {
    fn default() -> Self {
        Self {
            base_url: "https://restapi.amap.com/v3".to_string(),
            api_key: String::new(),
            timeout_secs: 10,
            retry: lookup_retry(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub retry: RetryPolicy,
}

impl JobApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for JobApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_secs: 30,
            retry: lookup_retry(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub retry: RetryPolicy,
}

impl OcrConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_secs: 60,
            // Parsing a document is expensive; do not repeat it blindly.
            retry: RetryPolicy::none(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub base_url: String,
    pub login_name: String,
    pub user_key: String,
    pub service_id: String,
    pub timeout_secs: u64,
    pub retry: RetryPolicy,
}

impl PolicyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            login_name: String::new(),
            user_key: String::new(),
            service_id: String::new(),
            timeout_secs: 30,
            retry: lookup_retry(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter string, e.g. `info` or `debug,tower_http=warn`.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub enable_metrics: bool,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            enable_metrics: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Burst size.
    pub capacity: u32,
    /// Sustained requests per second; 0 disables limiting.
    pub refill_per_second: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 200,
            refill_per_second: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestrationConfig {
    /// The only model name clients may ask for.
    pub exposed_model: String,
    pub max_iterations: usize,
    /// Pause between streamed job listings.
    pub listing_interval_ms: u64,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            exposed_model: "qd-job-turbo".to_string(),
            max_iterations: 10,
            listing_interval_ms: 1000,
        }
    }
}

impl OrchestrationConfig {
    pub fn listing_interval(&self) -> Duration {
        Duration::from_millis(self.listing_interval_ms)
    }
}

impl GatewayConfig {
    /// Loads the file at `path`, applies process environment overrides, fills
    /// defaults and validates.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration_with_context(
                format!("failed to read config file: {}", e),
                ErrorContext::new()
                    .with_field_path(path.display().to_string())
                    .with_source("config_loader"),
            )
        })?;
        let mut cfg = Self::parse(&raw)?;
        cfg.apply_env_overrides(|key| std::env::var(key).ok());
        cfg.finalize()?;
        Ok(cfg)
    }

    /// Parses YAML, fills defaults and validates, without reading the environment.
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let mut cfg = Self::parse(raw)?;
        cfg.finalize()?;
        Ok(cfg)
    }

    fn parse(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).map_err(|e| {
            Error::configuration_with_context(
                "failed to parse config file",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("config_loader"),
            )
        })
    }

    /// Applies the supported environment overrides through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(v) = non_empty("LLM_API_KEY") {
            self.llm.api_key = v;
        }
        if let Some(v) = non_empty("LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Some(v) = non_empty("AMAP_API_KEY") {
            self.amap.api_key = v;
        }
        if let Some(v) = non_empty("OCR_BASE_URL") {
            self.ocr.base_url = v;
        }
        if let Some(v) = non_empty("SERVER_PORT") {
            match v.parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %v, "ignoring invalid SERVER_PORT"),
            }
        }
    }

    fn finalize(&mut self) -> Result<()> {
        if self.server.host.is_empty() {
            self.server.host = ServerConfig::default().host;
        }
        if self.server.port == 0 {
            self.server.port = ServerConfig::default().port;
        }
        if self.orchestration.exposed_model.is_empty() {
            self.orchestration.exposed_model = OrchestrationConfig::default().exposed_model;
        }
        if self.orchestration.max_iterations == 0 {
            self.orchestration.max_iterations = OrchestrationConfig::default().max_iterations;
        }
        if self.logging.level.is_empty() {
            self.logging.level = LoggingConfig::default().level;
        }
        self.city.fill_defaults();
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.llm.base_url.trim().is_empty() {
            return Err(Error::configuration_with_context(
                "LLM base URL is required",
                ErrorContext::new().with_field_path("llm.base_url"),
            ));
        }
        if url::Url::parse(&self.llm.base_url).is_err() {
            return Err(Error::configuration_with_context(
                "LLM base URL is not a valid URL",
                ErrorContext::new()
                    .with_field_path("llm.base_url")
                    .with_details(self.llm.base_url.clone()),
            ));
        }
        if self.llm.model.trim().is_empty() {
            return Err(Error::configuration_with_context(
                "LLM model is required",
                ErrorContext::new().with_field_path("llm.model"),
            ));
        }
        Ok(())
    }
}

/// Picks the config path from `--config <path>` / `--config=<path>`, then
/// `GATEWAY_CONFIG`, then `config.yaml`.
pub fn resolve_config_path<I>(args: I, env_value: Option<String>) -> PathBuf
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--config" || arg == "-c" {
            if let Some(path) = args.next() {
                return PathBuf::from(path);
            }
        } else if let Some(path) = arg.strip_prefix("--config=") {
            return PathBuf::from(path);
        }
    }
    env_value
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
llm:
  base_url: "http://llm.local/v1"
  model: "qwen3"
"#;

    #[test]
    fn defaults_are_filled() {
        let cfg = GatewayConfig::from_yaml_str(MINIMAL).unwrap();
        assert_eq!(cfg.server.bind_address(), "0.0.0.0:8080");
        assert_eq!(cfg.city.system_name, "青岛岗位匹配系统");
        assert_eq!(cfg.city.area_codes.len(), 10);
        assert_eq!(cfg.llm.timeout(), Duration::from_secs(120));
        assert_eq!(cfg.llm.retry_policy().max_attempts, 3);
        assert_eq!(cfg.rate_limit.capacity, 200);
        assert_eq!(cfg.rate_limit.refill_per_second, 50);
        assert_eq!(cfg.orchestration.max_iterations, 10);
        assert!(cfg.performance.enable_metrics);
        assert_eq!(cfg.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn area_codes_are_described_in_code_order() {
        let cfg = GatewayConfig::from_yaml_str(MINIMAL).unwrap();
        let desc = cfg.city.area_codes_description();
        assert!(desc.starts_with("市南区(0), 市北区(1)"));
        assert!(desc.ends_with("莱西市(9)"));
        assert_eq!(cfg.city.area_name("3"), Some("崂山区"));
        assert_eq!(cfg.city.area_name("42"), None);
    }

    #[test]
    fn env_overrides_take_precedence() {
        let mut cfg = GatewayConfig::parse(MINIMAL).unwrap();
        cfg.apply_env_overrides(|key| match key {
            "LLM_API_KEY" => Some("sk-env".to_string()),
            "SERVER_PORT" => Some("9090".to_string()),
            "OCR_BASE_URL" => Some(String::new()),
            _ => None,
        });
        cfg.finalize().unwrap();
        assert_eq!(cfg.llm.api_key, "sk-env");
        assert_eq!(cfg.server.port, 9090);
        assert!(cfg.ocr.base_url.is_empty());
    }

    #[test]
    fn legacy_max_retries_overrides_policy() {
        let cfg = GatewayConfig::from_yaml_str(
            r#"
llm:
  base_url: "http://llm.local/v1"
  model: "m"
  max_retries: 5
  retry:
    backoff: exponential
"#,
        )
        .unwrap();
        let policy = cfg.llm.retry_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.backoff, Backoff::Exponential);
    }

    #[test]
    fn missing_llm_settings_are_rejected() {
        let err = GatewayConfig::from_yaml_str("server:\n  port: 1\n").unwrap_err();
        match err {
            Error::Configuration { context, .. } => {
                assert_eq!(context.field_path.as_deref(), Some("llm.base_url"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn config_path_resolution_order() {
        let args = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(
            resolve_config_path(args(&["bin", "--config", "a.yaml"]), Some("b.yaml".into())),
            PathBuf::from("a.yaml")
        );
        assert_eq!(
            resolve_config_path(args(&["bin", "--config=c.yaml"]), None),
            PathBuf::from("c.yaml")
        );
        assert_eq!(
            resolve_config_path(args(&["bin"]), Some("b.yaml".into())),
            PathBuf::from("b.yaml")
        );
        assert_eq!(
            resolve_config_path(args(&["bin"]), None),
            PathBuf::from(DEFAULT_CONFIG_PATH)
        );
    }
}
