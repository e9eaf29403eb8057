//! CORS for browser clients of the gateway.

use std::time::Duration;

use axum::http::{Method, header};
use tower_http::cors::{Any, CorsLayer};

/// Any origin may call the API and read the `Authorization` header carrying
/// a new session token. Preflight responses are cached for ten minutes.
pub fn gateway() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::PUT,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([header::AUTHORIZATION])
        .max_age(Duration::from_secs(600))
}
