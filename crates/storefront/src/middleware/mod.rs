//! HTTP middleware stack for the storefront API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span with `request_id`)
//! 3. Request ID
//! 4. CORS
//! 5. Security headers
//! 6. Session layer (tower-sessions, signed cookie)
//! 7. Rate limiting on `/api/register` and `/api/login` (governor)

pub mod auth;
pub mod cors;
pub mod json;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth, clear_current_user, set_current_user};
pub use cors::cors_layer;
pub use json::AppJson;
pub use rate_limit::{RateLimiterLayer, auth_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
