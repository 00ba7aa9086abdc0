use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::metrics::{QUOTA_REJECTED, REQUEST_LATENCY, REQUEST_TOTAL};
use crate::models::{ErrorResponse, VerifyRequest, VerifyResponse};
use crate::rate_limit::Decision;
use crate::state::AppState;

// Resolve the rate limit identity for this request. Behind a reverse
// proxy the peer address is the proxy itself, so when trust_proxy is
// set the first X-Forwarded-For entry wins.
fn client_ip(headers: &HeaderMap, peer: SocketAddr, trust_proxy: bool) -> String {
    if trust_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }
    peer.ip().to_string()
}

// The domain is whatever sits between the first '@' and the next one,
// if any
fn extract_domain(email: &str) -> Option<&str> {
    match email.split('@').nth(1) {
        Some(domain) if !domain.is_empty() => Some(domain),
        _ => None,
    }
}

// post handler for /v1/verify
pub async fn verify_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<VerifyRequest>,
) -> Response {
    REQUEST_TOTAL.inc();

    let client = client_ip(&headers, peer, state.trust_proxy);
    if state.limiter.check(&client).await == Decision::Limited {
        QUOTA_REJECTED.inc();
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorResponse::new(
                "Too many requests. Please try again after 24 hours.",
            )),
        )
            .into_response();
    }

    let start_time = Instant::now();

    let Some(email) = payload.email.as_ref().and_then(|value| value.as_str()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                "Invalid input. Please provide an email in the request body.",
            )),
        )
            .into_response();
    };

    let Some(domain) = extract_domain(email) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Invalid email format.")),
        )
            .into_response();
    };

    // Lookup is lowercased; the echoed fields keep the submitted case.
    // Anything not in the set counts as valid, never as unknown.
    let is_disposable = state.domains.contains(&domain.to_lowercase());

    let response = if is_disposable {
        VerifyResponse {
            status: "invalid",
            message: "Disposable or temporary email domain found.",
            email: email.to_string(),
            domain: domain.to_string(),
            is_disposable: true,
        }
    } else {
        VerifyResponse {
            status: "valid",
            message: "Email domain appears to be valid.",
            email: email.to_string(),
            domain: domain.to_string(),
            is_disposable: false,
        }
    };

    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());

    (StatusCode::OK, Json(response)).into_response()
}
