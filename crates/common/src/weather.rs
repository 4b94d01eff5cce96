//! Client for the upstream current-weather API.
//!
//! The upstream is treated as an opaque GET endpoint returning JSON; the body
//! is passed back untouched.

use std::time::Duration;

use tracing::{debug, warn};

use crate::CoreError;

/// What to look the weather up by.
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherQuery {
    City(String),
    Coordinates { lat: f64, lon: f64 },
}

impl WeatherQuery {
    fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            WeatherQuery::City(city) => vec![("q", city.clone())],
            WeatherQuery::Coordinates { lat, lon } => {
                vec![("lat", lat.to_string()), ("lon", lon.to_string())]
            }
        }
    }
}

#[derive(Clone)]
pub struct WeatherClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    units: String,
}

impl WeatherClient {
    pub fn new(api_url: &str, api_key: &str, units: &str, timeout: Duration) -> Result<Self, CoreError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Network(e.to_string()))?;
        Ok(Self {
            http,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
            units: units.to_string(),
        })
    }

    /// Fetch current weather. Non-200 upstream answers become `CoreError::Upstream`.
    pub async fn fetch(&self, query: &WeatherQuery) -> Result<serde_json::Value, CoreError> {
        let mut params = vec![("appid", self.api_key.clone()), ("units", self.units.clone())];
        params.extend(query.params());

        debug!(url = %self.api_url, ?query, "fetching weather");
        let resp = self
            .http
            .get(&self.api_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| CoreError::Network(e.to_string()))?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            warn!(status = status.as_u16(), ?query, "weather upstream returned non-200");
            return Err(CoreError::Upstream(status.as_u16()));
        }

        resp.json::<serde_json::Value>()
            .await
            .map_err(|e| CoreError::Parse(e.to_string()))
    }
}
