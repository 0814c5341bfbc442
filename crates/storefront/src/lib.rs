//! AERO-X storefront library.
//!
//! The checkout and order API as a library, so the binary, the CLI, and the
//! router tests all build the same application.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod stripe;


use axum::{Router, body::Body, http::Request, middleware::from_fn};
use tower_http::trace::TraceLayer;
use tower_sessions::SessionStore;

use crate::middleware::{
    RateLimiterLayer, cors_layer, create_session_layer, request_id_middleware,
    security_headers_middleware,
};
use crate::state::AppState;

/// Build the application router with its middleware stack.
///
/// Sentry layers are left to the binary so tests run without a hub.
pub fn app<S>(state: AppState, session_store: S, limiter: Option<RateLimiterLayer>) -> Router
where
    S: SessionStore + Clone,
{
    let session_layer = create_session_layer(session_store, state.config());
    let cors = cors_layer(&state.config().frontend_url);

    routes::routes(limiter)
        .layer(session_layer)
        .layer(from_fn(security_headers_middleware))
        .layer(cors)
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}
