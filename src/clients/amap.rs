//! Amap (高德) place search.

use crate::config::AmapConfig;
use crate::resilience::RetryPolicy;
use crate::transport::http::read_json;
use crate::transport::HttpTransport;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};

/// POI type code for place names and addresses.
const PLACE_TYPES: &str = "190000";

/// Coordinates in the "lng,lat" order Amap returns them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoPoint {
    pub longitude: String,
    pub latitude: String,
}

impl GeoPoint {
    fn parse(location: &str) -> Option<Self> {
        let (lng, lat) = location.split_once(',')?;
        let (lng, lat) = (lng.trim(), lat.trim());
        if lng.is_empty() || lat.is_empty() {
            return None;
        }
        Some(Self {
            longitude: lng.to_string(),
            latitude: lat.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct PlaceResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    info: String,
    #[serde(default)]
    pois: Vec<Place>,
}

#[derive(Debug, Deserialize)]
struct Place {
    #[serde(default)]
    name: String,
    #[serde(default)]
    location: String,
}

#[derive(Debug, Clone)]
pub struct AmapClient {
    transport: HttpTransport,
    api_key: String,
    city: String,
    retry: RetryPolicy,
}

impl AmapClient {
    pub fn new(config: &AmapConfig, city: &str) -> Result<Self> {
        Ok(Self {
            transport: HttpTransport::new("amap", &config.base_url, config.timeout())?,
            api_key: config.api_key.clone(),
            city: city.to_string(),
            retry: config.retry.clone(),
        })
    }

    /// Coordinates of the first place matching `keywords` in the configured city.
    pub async fn search_place(&self, keywords: &str) -> Result<GeoPoint> {
        let query = [
            ("key", self.api_key.clone()),
            ("keywords", keywords.to_string()),
            ("types", PLACE_TYPES.to_string()),
            ("city", self.city.clone()),
            ("output", "JSON".to_string()),
        ];
        let transport = &self.transport;
        let query = &query;
        let body: PlaceResponse = self
            .retry
            .run("amap.place_text", None, move || async move {
                let resp = transport.get_query("/place/text", query).await?;
                read_json(resp).await
            })
            .await?;

        if body.status != "1" {
            return Err(Error::runtime_with_context(
                format!("地点查询失败: {}", body.info),
                ErrorContext::new().with_source("amap"),
            ));
        }

        let place = body.pois.first().ok_or_else(|| {
            Error::runtime_with_context(
                format!("未找到地点: {}", keywords),
                ErrorContext::new().with_source("amap"),
            )
        })?;
        tracing::debug!(keywords, place = %place.name, location = %place.location, "place resolved");

        GeoPoint::parse(&place.location).ok_or_else(|| {
            Error::runtime_with_context(
                format!("地点坐标格式错误: {}", place.location),
                ErrorContext::new().with_source("amap"),
            )
        })
    }
}
