//! Job search API.

use crate::config::JobApiConfig;
use crate::resilience::RetryPolicy;
use crate::transport::http::read_json;
use crate::transport::HttpTransport;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};

/// Query sent to the job API. Unset filters are left out of the query string.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobQuery {
    pub current: u32,
    pub page_size: u32,
    pub job_title: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub radius: Option<String>,
    pub order: Option<String>,
    pub min_salary: Option<String>,
    pub max_salary: Option<String>,
    pub experience: Option<String>,
    pub education: Option<String>,
    pub company_nature: Option<String>,
    pub job_location_area_code: Option<String>,
}

impl JobQuery {
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut q = vec![
            ("current", self.current.to_string()),
            ("pageSize", self.page_size.to_string()),
        ];
        let optional = [
            ("jobTitle", &self.job_title),
            ("latitude", &self.latitude),
            ("longitude", &self.longitude),
            ("radius", &self.radius),
            ("order", &self.order),
            ("minSalary", &self.min_salary),
            ("maxSalary", &self.max_salary),
            ("experience", &self.experience),
            ("education", &self.education),
            ("companyNature", &self.company_nature),
            ("jobLocationAreaCode", &self.job_location_area_code),
        ];
        for (name, value) in optional {
            if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
                q.push((name, v.to_string()));
            }
        }
        q
    }
}

/// One row as the job API returns it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobRow {
    pub job_title: String,
    pub company_name: String,
    pub min_salary: Option<i64>,
    pub max_salary: Option<i64>,
    #[serde(deserialize_with = "crate::utils::opt_string")]
    pub education: Option<String>,
    #[serde(deserialize_with = "crate::utils::opt_string")]
    pub experience: Option<String>,
    pub app_job_url: String,
    pub job_location_area_code: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct JobApiResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    rows: Vec<JobRow>,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

fn null_as_empty<'de, D>(d: D) -> std::result::Result<Vec<JobRow>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<JobRow>>::deserialize(d)?.unwrap_or_default())
}

/// Rows plus the opaque `data` field of a successful search.
#[derive(Debug, Clone, Default)]
pub struct JobSearchResult {
    pub rows: Vec<JobRow>,
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct JobApiClient {
    transport: HttpTransport,
    retry: RetryPolicy,
}

impl JobApiClient {
    pub fn new(config: &JobApiConfig) -> Result<Self> {
        Ok(Self {
            transport: HttpTransport::new("job_api", &config.base_url, config.timeout())?,
            retry: config.retry.clone(),
        })
    }

    pub async fn search(&self, query: &JobQuery) -> Result<JobSearchResult> {
        let params = query.to_query();
        let transport = &self.transport;
        let params = &params;
        let body: JobApiResponse = self
            .retry
            .run("job_api.search", None, move || async move {
                let resp = transport.get_query("", params).await?;
                read_json(resp).await
            })
            .await?;

        if body.code != 200 {
            let msg = if body.msg.is_empty() {
                format!("API返回错误代码: {}", body.code)
            } else {
                body.msg
            };
            return Err(Error::runtime_with_context(
                format!("岗位API返回错误: {}", msg),
                ErrorContext::new().with_source("job_api"),
            ));
        }

        tracing::debug!(rows = body.rows.len(), "job search finished");
        Ok(JobSearchResult {
            rows: body.rows,
            data: body.data.filter(|d| !d.is_null()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_and_empty_filters_are_skipped() {
        let q = JobQuery {
            current: 2,
            page_size: 5,
            job_title: Some("Java".into()),
            order: Some(String::new()),
            job_location_area_code: Some("0".into()),
            ..JobQuery::default()
        };
        assert_eq!(
            q.to_query(),
            vec![
                ("current", "2".to_string()),
                ("pageSize", "5".to_string()),
                ("jobTitle", "Java".to_string()),
                ("jobLocationAreaCode", "0".to_string()),
            ]
        );
    }

    #[test]
    fn rows_tolerate_missing_fields() {
        let body: JobApiResponse = serde_json::from_value(serde_json::json!({
            "code": 200,
            "rows": [{"jobTitle": "Java开发", "minSalary": 8000, "jobLocationAreaCode": 0}],
            "data": null
        }))
        .unwrap();
        assert_eq!(body.rows[0].job_title, "Java开发");
        assert_eq!(body.rows[0].max_salary, None);
        assert!(body.data.is_none());
    }
}
