//! Middleware putting a [`RateLimiter`] in front of a group of routes.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use common::metrics::RATE_LIMITED_TOTAL;
use service::rate_limiter::RateLimiter;

use crate::errors::JsonApiError;

#[derive(Clone)]
pub struct RateLimitGuard {
    /// Metric label, e.g. "weather".
    pub scope: &'static str,
    pub limiter: RateLimiter,
    pub trust_forwarded_for: bool,
}

impl RateLimitGuard {
    pub fn new(scope: &'static str, limiter: RateLimiter, trust_forwarded_for: bool) -> Self {
        Self { scope, limiter, trust_forwarded_for }
    }
}

/// Client identity: the peer IP, or the first `X-Forwarded-For` hop when
/// the deployment sits behind a trusted proxy.
pub fn client_key(req: &Request, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = req
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn enforce(State(guard): State<RateLimitGuard>, req: Request, next: Next) -> Response {
    let key = client_key(&req, guard.trust_forwarded_for);
    if guard.limiter.is_allowed(&key).await {
        return next.run(req).await;
    }

    RATE_LIMITED_TOTAL.with_label_values(&[guard.scope]).inc();
    let wait = guard.limiter.retry_after(&key).await.as_secs().max(1);
    let mut resp = JsonApiError::new(
        StatusCode::TOO_MANY_REQUESTS,
        "Rate limit exceeded",
        Some(format!("try again in {wait} seconds")),
    )
    .into_response();
    resp.headers_mut().insert(header::RETRY_AFTER, HeaderValue::from(wait));
    resp
}
