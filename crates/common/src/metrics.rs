use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec, TextEncoder};

// Prometheus metrics (default registry)
pub static WEATHER_REQUESTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "weather_requests_total",
        "Total weather lookups forwarded upstream"
    )
    .expect("register weather_requests_total")
});

pub static WEATHER_UPSTREAM_ERRORS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "weather_upstream_errors_total",
        "Total failed weather lookups (transport or non-200)"
    )
    .expect("register weather_upstream_errors_total")
});

pub static RATE_LIMITED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "weather_rate_limited_total",
        "Total requests rejected by a rate limiter",
        &["limiter"]
    )
    .expect("register weather_rate_limited_total")
});

pub static LOCATION_MUTATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "location_mutations_total",
        "Total persisted location mutations",
        &["op"]
    )
    .expect("register location_mutations_total")
});

pub fn encode_metrics() -> (axum::http::StatusCode, String) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encode error: {e}"),
        );
    }
    (
        axum::http::StatusCode::OK,
        String::from_utf8(buffer).unwrap_or_default(),
    )
}
