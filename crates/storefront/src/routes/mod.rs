//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Liveness
//! GET  /health/ready               - Readiness (store ping)
//! POST /webhook                    - Stripe events (raw body)
//!
//! # Accounts
//! POST /api/register               - Create account, start session
//! POST /api/login                  - Start session
//! POST /api/logout                 - End session
//! GET  /api/session                - Current session identity
//!
//! # Profile (requires auth)
//! GET  /api/profile                - Name, address, email
//! PUT  /api/profile                - Replace name and address
//! PUT  /api/profile/password       - Change password
//!
//! # Catalog
//! GET  /api/products               - All products
//! GET  /api/products/{slug}        - One product
//!
//! # Checkout
//! POST /api/checkout               - Signed-in checkout (requires auth)
//! POST /api/smart-checkout         - Checkout for any shopper
//! POST /api/create-payment-intent  - Stripe payment intent
//!
//! # Orders (requires auth)
//! GET  /api/my-orders              - Order history
//! POST /api/return/{orderId}       - Start a return
//! ```

pub mod auth;
pub mod checkout;
pub mod health;
pub mod orders;
pub mod products;
pub mod profile;
pub mod webhook;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::middleware::RateLimiterLayer;
use crate::state::AppState;

/// Register and login, optionally behind the per-IP limiter.
pub fn credential_routes(limiter: Option<RateLimiterLayer>) -> Router<AppState> {
    let router = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    match limiter {
        Some(layer) => router.layer(layer),
        None => router,
    }
}

/// Everything under `/api`.
pub fn api_routes(limiter: Option<RateLimiterLayer>) -> Router<AppState> {
    Router::new()
        .merge(credential_routes(limiter))
        .route("/logout", post(auth::logout))
        .route("/session", get(auth::current_session))
        .route("/profile", get(profile::show).put(profile::update))
        .route("/profile/password", put(profile::change_password))
        .route("/products", get(products::index))
        .route("/products/{slug}", get(products::show))
        .route("/checkout", post(checkout::checkout))
        .route("/smart-checkout", post(checkout::smart_checkout))
        .route(
            "/create-payment-intent",
            post(checkout::create_payment_intent),
        )
        .route("/my-orders", get(orders::my_orders))
        .route("/return/{order_id}", post(orders::initiate_return))
}

/// Create all routes for the storefront.
pub fn routes(limiter: Option<RateLimiterLayer>) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/webhook", post(webhook::handle))
        .nest("/api", api_routes(limiter))
        .fallback(health::not_found)
}
