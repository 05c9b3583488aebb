//! Typed arguments for each tool.

use super::ToolError;
use crate::clients::{JobQuery, PolicyQuery};
use crate::utils::{lenient_bool, opt_string, opt_u32};
use serde::Deserialize;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Parses raw model arguments: empty input and non-JSON input are rejected
/// here, shape problems are reported by the typed parse.
pub fn parse<T: for<'de> Deserialize<'de>>(raw: &str) -> Result<T, ToolError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ToolError::EmptyArguments);
    }
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| ToolError::MalformedArguments(e.to_string()))?;
    serde_json::from_value(value).map_err(|e| ToolError::InvalidArgument(format!("参数格式错误: {}", e)))
}

#[derive(Debug, Default, Deserialize)]
pub struct LocationArgs {
    #[serde(default, deserialize_with = "opt_string")]
    pub keywords: Option<String>,
}

impl LocationArgs {
    pub fn keywords(self) -> Result<String, ToolError> {
        self.keywords.ok_or(ToolError::MissingArgument("keywords"))
    }
}

/// Shared by `queryJobsByArea` and `queryJobsByLocation`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobSearchArgs {
    #[serde(deserialize_with = "opt_string")]
    pub job_title: Option<String>,
    #[serde(deserialize_with = "opt_u32")]
    pub current: Option<u32>,
    #[serde(deserialize_with = "opt_u32")]
    pub page_size: Option<u32>,
    #[serde(deserialize_with = "opt_string")]
    pub latitude: Option<String>,
    #[serde(deserialize_with = "opt_string")]
    pub longitude: Option<String>,
    #[serde(deserialize_with = "opt_string")]
    pub radius: Option<String>,
    #[serde(deserialize_with = "opt_string")]
    pub order: Option<String>,
    #[serde(deserialize_with = "opt_string")]
    pub min_salary: Option<String>,
    #[serde(deserialize_with = "opt_string")]
    pub max_salary: Option<String>,
    #[serde(deserialize_with = "opt_string")]
    pub experience: Option<String>,
    #[serde(deserialize_with = "opt_string")]
    pub education: Option<String>,
    #[serde(deserialize_with = "opt_string")]
    pub company_nature: Option<String>,
    #[serde(deserialize_with = "opt_string")]
    pub job_location_area_code: Option<String>,
}

impl JobSearchArgs {
    pub fn into_query(self) -> JobQuery {
        JobQuery {
            current: self.current.filter(|n| *n > 0).unwrap_or(DEFAULT_PAGE),
            page_size: self.page_size.filter(|n| *n > 0).unwrap_or(DEFAULT_PAGE_SIZE),
            job_title: self.job_title,
            latitude: self.latitude,
            longitude: self.longitude,
            radius: self.radius,
            order: self.order,
            min_salary: self.min_salary,
            max_salary: self.max_salary,
            experience: self.experience,
            education: self.education,
            company_nature: self.company_nature,
            job_location_area_code: self.job_location_area_code,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfArgs {
    #[serde(default, deserialize_with = "opt_string")]
    pub file_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageArgs {
    #[serde(default, deserialize_with = "opt_string")]
    pub image_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyArgs {
    #[serde(deserialize_with = "opt_string")]
    pub message: Option<String>,
    #[serde(deserialize_with = "opt_string")]
    pub chat_id: Option<String>,
    #[serde(deserialize_with = "opt_string")]
    pub conversation_id: Option<String>,
    #[serde(deserialize_with = "lenient_bool")]
    pub real_name: bool,
    #[serde(deserialize_with = "opt_string")]
    pub aac001: Option<String>,
    #[serde(deserialize_with = "opt_string")]
    pub aac147: Option<String>,
    #[serde(deserialize_with = "opt_string")]
    pub aac003: Option<String>,
}

impl PolicyArgs {
    pub fn into_query(self) -> Result<PolicyQuery, ToolError> {
        let message = self.message.ok_or(ToolError::MissingArgument("message"))?;
        if self.real_name
            && (self.aac001.is_none() || self.aac147.is_none() || self.aac003.is_none())
        {
            return Err(ToolError::InvalidArgument(
                "实名咨询需要同时提供aac001、aac147和aac003".to_string(),
            ));
        }
        let mut query = PolicyQuery::new(message);
        query.chat_id = self.chat_id;
        query.conversation_id = self.conversation_id;
        query.real_name = self.real_name;
        if self.real_name {
            query.aac001 = self.aac001;
            query.aac147 = self.aac147;
            query.aac003 = self.aac003;
        }
        Ok(query)
    }
}
