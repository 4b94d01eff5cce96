use std::sync::Arc;
use std::time::Duration;

use common::weather::WeatherClient;
use configs::AppConfig;
use service::locations::{LocationRepository, LocationStore};
use service::rate_limiter::RateLimiter;

/// Everything handlers share. Built once at startup.
#[derive(Clone)]
pub struct ServerState {
    pub locations: Arc<dyn LocationRepository>,
    pub weather: WeatherClient,
    pub weather_limiter: RateLimiter,
    pub write_limiter: RateLimiter,
    pub trust_forwarded_for: bool,
}

impl ServerState {
    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let w = &cfg.weather;
        let weather = WeatherClient::new(&w.api_url, &w.api_key, &w.units, Duration::from_secs(w.timeout_secs))?;
        let rl = &cfg.rate_limit;
        Ok(Self {
            locations: LocationStore::new(cfg.storage.locations_path.clone()),
            weather,
            weather_limiter: RateLimiter::new(rl.weather_max_calls, Duration::from_secs(rl.weather_time_frame_secs), rl.enabled),
            write_limiter: RateLimiter::new(rl.write_max_calls, Duration::from_secs(rl.write_time_frame_secs), rl.enabled),
            trust_forwarded_for: rl.trust_forwarded_for,
        })
    }
}
