//! Presentation of job search results.

use crate::clients::{JobRow, JobSearchResult};
use crate::config::CityConfig;
use serde::{Deserialize, Serialize};

/// A job as shown to the model and streamed to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobListing {
    pub job_title: String,
    pub company_name: String,
    pub salary: String,
    pub location: String,
    pub education: String,
    pub experience: String,
    pub app_job_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSearchOutput {
    #[serde(default)]
    pub job_listings: Vec<JobListing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JobSearchOutput {
    pub fn from_result(result: JobSearchResult, city: &CityConfig) -> Self {
        let mut job_listings: Vec<JobListing> =
            result.rows.iter().map(|row| format_row(row, city)).collect();
        if let (Some(last), Some(data)) = (job_listings.last_mut(), result.data.as_ref()) {
            last.data = Some(data.clone());
        }
        Self {
            job_listings,
            data: result.data,
        }
    }

    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn format_row(row: &JobRow, city: &CityConfig) -> JobListing {
    let min = row.min_salary.unwrap_or(0);
    let max = row.max_salary.unwrap_or(0);
    let salary = if min > 0 || max > 0 {
        format!("{}-{}元/月", min, max)
    } else {
        "薪资面议".to_string()
    };

    let location = row
        .job_location_area_code
        .and_then(|code| city.area_name(&code.to_string()))
        .unwrap_or("未知地区");

    JobListing {
        job_title: row.job_title.clone(),
        company_name: row.company_name.clone(),
        salary,
        location: location.to_string(),
        education: education_label(row.education.as_deref()).to_string(),
        experience: experience_label(row.experience.as_deref()).to_string(),
        app_job_url: row.app_job_url.clone(),
        data: None,
    }
}

pub fn education_label(code: Option<&str>) -> &'static str {
    match code.map(str::trim) {
        Some("0") => "初中及以下",
        Some("1") => "中专/中技",
        Some("2") => "高中",
        Some("3") => "大专",
        Some("4") => "本科",
        Some("5") => "硕士",
        Some("6") => "博士",
        Some("7") => "MBA/EMBA",
        Some("8") => "留学-学士",
        Some("9") => "留学-硕士",
        Some("10") => "留学-博士",
        _ => "学历不限",
    }
}

pub fn experience_label(code: Option<&str>) -> &'static str {
    match code.map(str::trim) {
        Some("1") => "实习生",
        Some("2") => "应届毕业生",
        Some("3") => "1年以下",
        Some("4") => "1-3年",
        Some("5") => "3-5年",
        Some("6") => "5-10年",
        Some("7") => "10年以上",
        _ => "经验不限",
    }
}

pub fn company_nature_label(code: Option<&str>) -> Option<&'static str> {
    match code.map(str::trim) {
        Some("1") => Some("私营企业"),
        Some("2") => Some("股份制企业"),
        Some("3") => Some("国有企业"),
        Some("4") => Some("外商及港澳台投资企业"),
        Some("5") => Some("医院"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use serde_json::json;

    fn city() -> CityConfig {
        GatewayConfig::from_yaml_str("llm:\n  base_url: http://x\n  model: m\n")
            .unwrap()
            .city
    }

    #[test]
    fn rows_are_decoded_and_data_lands_on_last_listing() {
        let result = JobSearchResult {
            rows: vec![
                JobRow {
                    job_title: "Java开发".into(),
                    company_name: "海尔".into(),
                    min_salary: Some(8000),
                    max_salary: Some(12000),
                    education: Some("4".into()),
                    experience: Some("4".into()),
                    app_job_url: "https://jobs/1".into(),
                    job_location_area_code: Some(0),
                },
                JobRow {
                    job_title: "测试".into(),
                    job_location_area_code: Some(99),
                    ..JobRow::default()
                },
            ],
            data: Some(json!({"total": 2})),
        };
        let out = JobSearchOutput::from_result(result, &city());
        let first = &out.job_listings[0];
        assert_eq!(first.salary, "8000-12000元/月");
        assert_eq!(first.location, "市南区");
        assert_eq!(first.education, "本科");
        assert_eq!(first.experience, "1-3年");
        assert!(first.data.is_none());

        let last = &out.job_listings[1];
        assert_eq!(last.salary, "薪资面议");
        assert_eq!(last.location, "未知地区");
        assert_eq!(last.education, "学历不限");
        assert_eq!(last.data, Some(json!({"total": 2})));
    }

    #[test]
    fn empty_result_serializes_empty_list() {
        let out = JobSearchOutput::from_result(JobSearchResult::default(), &city());
        let v: serde_json::Value = serde_json::from_str(&out.to_pretty_json().unwrap()).unwrap();
        assert_eq!(v, json!({"jobListings": []}));
    }

    #[test]
    fn labels() {
        assert_eq!(education_label(Some("-1")), "学历不限");
        assert_eq!(experience_label(Some("0")), "经验不限");
        assert_eq!(company_nature_label(Some("3")), Some("国有企业"));
        assert_eq!(company_nature_label(None), None);
    }
}
