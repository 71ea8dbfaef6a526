//! CORS headers for the counter endpoint.
//!
//! Browsers calling the endpoint from another origin need these on every
//! response, including errors, or the script never sees the body.

use axum::extract::Request;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;

/// Origins allowed to read responses.
pub const ALLOW_ORIGIN: &str = "*";
/// Methods the endpoint accepts.
pub const ALLOW_METHODS: &str = "POST,OPTIONS";
/// Request headers a preflight may ask for.
pub const ALLOW_HEADERS: &str = "*";

/// Headers carried by a preflight response.
pub fn preflight_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    apply(&mut headers);
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers
}

/// Middleware stamping origin and method grants on every response.
pub async fn cors_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    apply(response.headers_mut());
    response
}

fn apply(headers: &mut HeaderMap) {
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static(ALLOW_ORIGIN));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
}
