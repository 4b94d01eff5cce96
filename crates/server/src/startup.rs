use std::net::SocketAddr;

use axum::Router;
use configs::AppConfig;
use dotenvy::dotenv;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::errors::StartupError;
use crate::routes;
use crate::state::ServerState;

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

fn bind_addr(cfg: &AppConfig) -> Result<SocketAddr, StartupError> {
    format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .map_err(|e| StartupError::InvalidConfig(format!("server bind address: {e}")))
}

/// Build the application from config: shared state plus router.
pub fn build_app(cfg: &AppConfig) -> Result<Router, StartupError> {
    let state = ServerState::from_config(cfg)?;
    Ok(routes::build_router(state, &cfg.storage.frontend_dir, build_cors()))
}

/// Public entry: load config, build the app and run the HTTP server.
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();

    let cfg = AppConfig::load_or_env()?;
    if cfg.weather.api_key.trim().is_empty() {
        tracing::warn!("no weather API key configured; set weather.api_key or WEATHER_API_KEY");
    }

    service::runtime::ensure_env(&cfg.storage.frontend_dir, &cfg.storage.locations_path)
        .await
        .map_err(|e| StartupError::Runtime(e.to_string()))?;

    let app = build_app(&cfg)?;

    let addr = bind_addr(&cfg)?;
    info!(
        %addr,
        locations_path = %cfg.storage.locations_path.display(),
        weather_limit = cfg.rate_limit.weather_max_calls,
        write_limit = cfg.rate_limit.write_max_calls,
        "starting weather server"
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
