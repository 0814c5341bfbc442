//! Authentication extractors and session helpers.
//!
//! The session holds a [`CurrentUser`] under
//! [`session_keys::CURRENT_USER`]. Handlers never parse the cookie
//! themselves; they ask for [`RequireAuth`] or [`OptionalAuth`].

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_sessions::Session;

use crate::models::{CurrentUser, session_keys};

/// Extractor that requires a logged-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn my_orders(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("orders for {}", user.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Rejection for [`RequireAuth`].
pub struct AuthRejection;

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Access denied. No token provided." })),
        )
            .into_response()
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current_user(parts).await.map(Self).ok_or(AuthRejection)
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this never rejects. Checkout uses it to tell
/// signed-in shoppers from guests.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(current_user(parts).await))
    }
}

async fn current_user(parts: &Parts) -> Option<CurrentUser> {
    // Set by SessionManagerLayer
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

/// Log a user in: rotate the session id, then store the user.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Log the user out and drop the session record.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
