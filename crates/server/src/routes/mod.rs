use std::path::Path;

use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::Health;

use crate::rate_limit::{self, RateLimitGuard};
use crate::state::ServerState;

pub mod locations;
pub mod weather;

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn metrics() -> (StatusCode, String) {
    common::metrics::encode_metrics()
}

/// Build the full application router: reads, rate-limited writes, the
/// rate-limited weather proxy and the static frontend.
pub fn build_router(state: ServerState, frontend_dir: &str, cors: CorsLayer) -> Router {
    let static_dir = ServeDir::new(frontend_dir).fallback(ServeFile::new(Path::new(frontend_dir).join("index.html")));

    let reads = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/locations", get(locations::list))
        .route("/locations/search", get(locations::search))
        .route("/locations/:id", get(locations::get))
        .route("/favorites", get(locations::favorites));

    let writes = Router::new()
        .route("/locations", post(locations::create))
        .route("/locations/:id", put(locations::update).delete(locations::delete))
        .route_layer(middleware::from_fn_with_state(
            RateLimitGuard::new("write", state.write_limiter.clone(), state.trust_forwarded_for),
            rate_limit::enforce,
        ));

    let weather = Router::new()
        .route("/weather", get(weather::get_weather))
        .route_layer(middleware::from_fn_with_state(
            RateLimitGuard::new("weather", state.weather_limiter.clone(), state.trust_forwarded_for),
            rate_limit::enforce,
        ));

    reads
        .merge(writes)
        .merge(weather)
        .with_state(state)
        .fallback_service(static_dir)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                // 每次请求创建 span，包含方法和路径
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                // 响应返回时记录状态码与耗时
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
