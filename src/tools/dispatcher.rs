use super::args::{self, ImageArgs, JobSearchArgs, LocationArgs, PdfArgs, PolicyArgs};
use super::catalog::tool_definitions;
use super::format::JobSearchOutput;
use super::{names, ToolError, ToolExecutor};
use crate::clients::{AmapClient, JobApiClient, PolicyClient};
use crate::config::{CityConfig, GatewayConfig};
use crate::types::ToolDefinition;
use crate::Result;
use async_trait::async_trait;
use serde_json::json;

/// Routes tool calls by name to the collaborator clients.
pub struct ToolDispatcher {
    city: CityConfig,
    definitions: Vec<ToolDefinition>,
    amap: AmapClient,
    jobs: JobApiClient,
    policy: PolicyClient,
}

impl ToolDispatcher {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        Ok(Self {
            definitions: tool_definitions(&config.city),
            city: config.city.clone(),
            amap: AmapClient::new(&config.amap, &config.city.name)?,
            jobs: JobApiClient::new(&config.job_api)?,
            policy: PolicyClient::new(&config.policy)?,
        })
    }

    async fn query_location(&self, raw: &str) -> std::result::Result<String, ToolError> {
        let keywords = args::parse::<LocationArgs>(raw)?.keywords()?;
        let point = self.amap.search_place(&keywords).await?;
        let out = json!({
            "keywords": keywords,
            "latitude": point.latitude,
            "longitude": point.longitude,
            "message": format!("成功获取地点 {} 的坐标", keywords),
        });
        Ok(serde_json::to_string_pretty(&out).map_err(crate::Error::from)?)
    }

    async fn query_jobs(&self, raw: &str) -> std::result::Result<String, ToolError> {
        let query = args::parse::<JobSearchArgs>(raw)?.into_query();
        let result = self.jobs.search(&query).await?;
        let output = JobSearchOutput::from_result(result, &self.city);
        tracing::info!(listings = output.job_listings.len(), "job search returned");
        Ok(output.to_pretty_json().map_err(crate::Error::from)?)
    }

    async fn query_policy(&self, raw: &str) -> std::result::Result<String, ToolError> {
        let query = args::parse::<PolicyArgs>(raw)?.into_query()?;
        let answer = self.policy.chat(&query).await?;
        Ok(serde_json::to_string(&answer).map_err(crate::Error::from)?)
    }
}

#[async_trait]
impl ToolExecutor for ToolDispatcher {
    fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    async fn execute(&self, name: &str, arguments: &str) -> std::result::Result<String, ToolError> {
        tracing::debug!(tool = %name, arguments, "executing tool");
        match name {
            names::QUERY_LOCATION => self.query_location(arguments).await,
            names::QUERY_JOBS_BY_AREA | names::QUERY_JOBS_BY_LOCATION => {
                self.query_jobs(arguments).await
            }
            names::PARSE_PDF => {
                args::parse::<PdfArgs>(arguments)?
                    .file_url
                    .ok_or(ToolError::MissingArgument("fileUrl"))?;
                Err(ToolError::Unsupported("PDF解析功能需要配合文件上传使用"))
            }
            names::PARSE_IMAGE => {
                args::parse::<ImageArgs>(arguments)?
                    .image_url
                    .ok_or(ToolError::MissingArgument("imageUrl"))?;
                Err(ToolError::Unsupported("图片解析功能需要配合文件上传使用"))
            }
            names::QUERY_POLICY => self.query_policy(arguments).await,
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }
}
