//! Account route handlers: register, login, logout, session.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_sessions::Session;
use tracing::instrument;

use aerox_core::{Email, UserId};

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{AppJson, RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::state::AppState;

/// Body of `POST /api/register` and `POST /api/login`.
#[derive(Debug, Default, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl CredentialsRequest {
    fn parts(&self) -> (&str, &str) {
        (
            self.email.as_deref().unwrap_or_default(),
            self.password.as_deref().unwrap_or_default(),
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub message: &'static str,
    pub user_id: UserId,
    pub email: Email,
}

async fn start_session(session: &Session, user: &User) -> Result<()> {
    set_current_user(
        session,
        &CurrentUser {
            id: user.id,
            email: user.email.clone(),
        },
    )
    .await?;
    set_sentry_user(&user.id);
    Ok(())
}

/// POST /api/register
///
/// # Errors
///
/// 400 on missing fields or a weak password, 409 if the email is taken.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    AppJson(body): AppJson<CredentialsRequest>,
) -> Result<(StatusCode, Json<AccountResponse>)> {
    let (email, password) = body.parts();
    let user = state.auth().register(email, password).await?;
    start_session(&session, &user).await?;

    tracing::info!(user_id = %user.id, "User registered");
    Ok((
        StatusCode::CREATED,
        Json(AccountResponse {
            message: "User registered successfully.",
            user_id: user.id,
            email: user.email,
        }),
    ))
}

/// POST /api/login
///
/// # Errors
///
/// 400 on missing fields, 401 on bad credentials.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    AppJson(body): AppJson<CredentialsRequest>,
) -> Result<Json<AccountResponse>> {
    let (email, password) = body.parts();
    let user = state.auth().login(email, password).await?;
    start_session(&session, &user).await?;

    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(AccountResponse {
        message: "Login successful.",
        user_id: user.id,
        email: user.email,
    }))
}

/// POST /api/logout
///
/// Idempotent: logging out without a session still succeeds.
///
/// # Errors
///
/// 500 if the session store fails.
pub async fn logout(session: Session) -> Result<Json<Value>> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Json(json!({ "message": "Logged out successfully." })))
}

/// GET /api/session
///
/// The identity behind the session cookie, so clients never decode it.
pub async fn current_session(RequireAuth(user): RequireAuth) -> Json<Value> {
    Json(json!({ "userId": user.id, "email": user.email }))
}
