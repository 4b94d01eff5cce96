use std::io;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use serde::Deserialize;

pub const DEFAULT_WEATHER_API_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 5001, worker_threads: Some(4) }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_locations_path")]
    pub locations_path: PathBuf,
    #[serde(default = "default_frontend_dir")]
    pub frontend_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { locations_path: default_locations_path(), frontend_dir: default_frontend_dir() }
    }
}

fn default_locations_path() -> PathBuf { PathBuf::from("data/locations.json") }
fn default_frontend_dir() -> String { "frontend".into() }

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Empty means "take it from WEATHER_API_KEY".
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_units")]
    pub units: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: String::new(),
            units: default_units(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_api_url() -> String { DEFAULT_WEATHER_API_URL.into() }
fn default_units() -> String { "metric".into() }
fn default_timeout() -> u64 { 10 }

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Key clients by the first `X-Forwarded-For` hop. Only safe behind a
    /// proxy that overwrites the header.
    #[serde(default)]
    pub trust_forwarded_for: bool,
    #[serde(default = "default_weather_max_calls")]
    pub weather_max_calls: usize,
    #[serde(default = "default_time_frame")]
    pub weather_time_frame_secs: u64,
    #[serde(default = "default_write_max_calls")]
    pub write_max_calls: usize,
    #[serde(default = "default_time_frame")]
    pub write_time_frame_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            trust_forwarded_for: false,
            weather_max_calls: default_weather_max_calls(),
            weather_time_frame_secs: default_time_frame(),
            write_max_calls: default_write_max_calls(),
            write_time_frame_secs: default_time_frame(),
        }
    }
}

fn default_weather_max_calls() -> usize { 30 }
fn default_write_max_calls() -> usize { 20 }
fn default_time_frame() -> u64 { 60 }
fn default_true() -> bool { true }

fn config_path() -> String {
    std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string())
}

pub fn load_default() -> Result<AppConfig> {
    load_from_file(&config_path())
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Config file when present, otherwise defaults plus SERVER_HOST/SERVER_PORT.
    pub fn load_or_env() -> Result<Self> {
        Self::load_or_env_from(&config_path())
    }

    /// Only a missing file falls back to the environment; a file that exists
    /// but cannot be read or parsed is an error.
    pub fn load_or_env_from(path: &str) -> Result<Self> {
        let mut cfg = match std::fs::read_to_string(path) {
            Ok(content) => parse(&content).map_err(|e| anyhow!("invalid config file {path}: {e}"))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Self::from_env(),
            Err(e) => return Err(anyhow!("failed to read config file {path}: {e}")),
        };
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    fn from_env() -> Self {
        let mut cfg = AppConfig::default();
        if let Ok(host) = std::env::var("SERVER_HOST") {
            cfg.server.host = host;
        }
        if let Some(port) = std::env::var("SERVER_PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            cfg.server.port = port;
        }
        cfg
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.weather.normalize_from_env();
        self.weather.validate()?;
        self.rate_limit.validate()?;
        if self.storage.locations_path.as_os_str().is_empty() {
            return Err(anyhow!("storage.locations_path must not be empty"));
        }
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be within 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        Ok(())
    }
}

impl WeatherConfig {
    pub fn normalize_from_env(&mut self) {
        if self.api_key.trim().is_empty() {
            if let Ok(key) = std::env::var("WEATHER_API_KEY") {
                self.api_key = key;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let lower = self.api_url.to_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(anyhow!("weather.api_url must start with http:// or https://"));
        }
        if self.timeout_secs == 0 {
            return Err(anyhow!("weather.timeout_secs must be a positive number of seconds"));
        }
        Ok(())
    }
}

impl RateLimitConfig {
    pub fn validate(&self) -> Result<()> {
        if self.weather_max_calls == 0 || self.write_max_calls == 0 {
            return Err(anyhow!("rate_limit max_calls values must be >= 1"));
        }
        if self.weather_time_frame_secs == 0 || self.write_time_frame_secs == 0 {
            return Err(anyhow!("rate_limit time frames must be positive seconds"));
        }
        Ok(())
    }
}
