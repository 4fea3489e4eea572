//! CORS overlay and preflight responder.
//!
//! Every response the proxy produces carries the same three permissive CORS
//! headers, whatever the upstream sent. `OPTIONS` never reaches the upstream.

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Response, StatusCode};

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_HEADERS: &str = "*";
pub const ALLOW_METHODS: &str = "GET,POST,PUT,PATCH,DELETE,OPTIONS";

/// The fixed CORS header set.
pub fn headers() -> [(HeaderName, HeaderValue); 3] {
    [
        (
            HeaderName::from_static("access-control-allow-origin"),
            HeaderValue::from_static(ALLOW_ORIGIN),
        ),
        (
            HeaderName::from_static("access-control-allow-headers"),
            HeaderValue::from_static(ALLOW_HEADERS),
        ),
        (
            HeaderName::from_static("access-control-allow-methods"),
            HeaderValue::from_static(ALLOW_METHODS),
        ),
    ]
}

/// Set the CORS headers, replacing any values already present.
pub fn apply(target: &mut HeaderMap) {
    for (name, value) in headers() {
        target.insert(name, value);
    }
}

/// 204, no body, CORS headers.
pub fn preflight() -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::NO_CONTENT;
    apply(response.headers_mut());
    response
}
