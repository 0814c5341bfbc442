//! CORS for the browser frontend.

use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Allow the configured frontend origin, with cookies.
///
/// An origin that is not a valid header value allows nothing rather than
/// everything.
#[must_use]
pub fn cors_layer(frontend_url: &str) -> CorsLayer {
    let origin = HeaderValue::from_str(frontend_url.trim_end_matches('/'))
        .map_or_else(|_| AllowOrigin::list([]), AllowOrigin::exact);

    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}
