use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    Json,
};
use common::metrics::{WEATHER_REQUESTS_TOTAL, WEATHER_UPSTREAM_ERRORS_TOTAL};
use common::weather::WeatherQuery;
use common::CoreError;
use serde::Deserialize;
use tracing::{error, info};

use crate::errors::JsonApiError;
use crate::state::ServerState;

const FETCH_FAILED: &str = "Failed to fetch weather data";

#[derive(Debug, Default, Deserialize)]
pub struct WeatherParams {
    pub city: Option<String>,
    pub lat: Option<String>,
    pub lon: Option<String>,
}

fn non_blank(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// City wins over coordinates; both coordinates are needed otherwise.
pub fn parse_query(params: &WeatherParams) -> Result<WeatherQuery, JsonApiError> {
    if let Some(city) = non_blank(&params.city) {
        return Ok(WeatherQuery::City(city.to_string()));
    }
    match (non_blank(&params.lat), non_blank(&params.lon)) {
        (Some(lat), Some(lon)) => match (lat.parse::<f64>(), lon.parse::<f64>()) {
            (Ok(lat), Ok(lon)) if lat.is_finite() && lon.is_finite() => Ok(WeatherQuery::Coordinates { lat, lon }),
            _ => Err(JsonApiError::new(StatusCode::BAD_REQUEST, "lat and lon must be numbers", None)),
        },
        _ => Err(JsonApiError::new(StatusCode::BAD_REQUEST, "Provide a city name or coordinates", None)),
    }
}

/// GET /weather?city= | ?lat=&lon=
pub async fn get_weather(
    State(state): State<ServerState>,
    params: Result<Query<WeatherParams>, QueryRejection>,
) -> Result<Json<serde_json::Value>, JsonApiError> {
    let Query(params) = params?;
    let query = parse_query(&params)?;
    WEATHER_REQUESTS_TOTAL.inc();
    info!(?query, "weather_lookup");

    match state.weather.fetch(&query).await {
        Ok(body) => Ok(Json(body)),
        Err(CoreError::Upstream(code)) => {
            WEATHER_UPSTREAM_ERRORS_TOTAL.inc();
            let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_GATEWAY);
            Err(JsonApiError::new(status, FETCH_FAILED, None))
        }
        Err(e) => {
            WEATHER_UPSTREAM_ERRORS_TOTAL.inc();
            error!(error = %e, "weather upstream call failed");
            Err(JsonApiError::new(StatusCode::BAD_GATEWAY, FETCH_FAILED, None))
        }
    }
}
