//! Profile route handlers.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use aerox_core::ShippingAddress;

use crate::db::RepositoryError;
use crate::error::{AppError, Result};
use crate::middleware::{AppJson, RequireAuth};
use crate::models::User;
use crate::services::auth::{AuthError, WeakPassword};
use crate::state::AppState;

/// Fields a client-supplied profile address must send as strings, when sent.
const ADDRESS_STRING_FIELDS: [&str; 5] = ["firstName", "lastName", "address", "city", "postalCode"];

/// GET /api/profile
///
/// # Errors
///
/// 404 if the session user no longer exists.
pub async fn show(State(state): State<AppState>, RequireAuth(user): RequireAuth) -> Result<Json<User>> {
    Ok(Json(state.auth().get_user(user.id).await?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub shipping_address: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileResponse {
    pub message: &'static str,
    pub name: Option<String>,
    pub shipping_address: Option<ShippingAddress>,
}

/// Read the optional profile address. Anything but an object clears it.
fn profile_address(raw: Option<&Value>) -> Result<Option<ShippingAddress>> {
    let Some(Value::Object(fields)) = raw else {
        return Ok(None);
    };

    for field in ADDRESS_STRING_FIELDS {
        if fields
            .get(field)
            .is_some_and(|v| !v.is_null() && !v.is_string())
        {
            return Err(AppError::validation(format!("Invalid {field} format.")));
        }
    }

    serde_json::from_value(Value::Object(fields.clone()))
        .map(Some)
        .map_err(|_| AppError::validation("Invalid shipping address."))
}

/// PUT /api/profile
///
/// Replaces both the name and the stored address.
///
/// # Errors
///
/// 400 on a malformed address, 404 if the session user no longer exists.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(body): AppJson<UpdateProfileRequest>,
) -> Result<Json<UpdateProfileResponse>> {
    let address = profile_address(body.shipping_address.as_ref())?;
    let name = body.name.filter(|n| !n.trim().is_empty());

    state
        .users()
        .update_profile(user.id, name.as_deref(), address.as_ref())
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("User not found.".to_string()),
            other => other.into(),
        })?;

    Ok(Json(UpdateProfileResponse {
        message: "Profile updated successfully.",
        name,
        shipping_address: address,
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
}

fn new_password_message(err: WeakPassword) -> String {
    match err {
        WeakPassword::MissingDigit => {
            "New password must contain at least one numeric digit.".to_string()
        }
        other => other.message_for("New password"),
    }
}

/// PUT /api/profile/password
///
/// # Errors
///
/// 400 on missing fields or a weak new password, 401 if the current
/// password does not verify.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn change_password(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(body): AppJson<ChangePasswordRequest>,
) -> Result<Json<Value>> {
    let (Some(current), Some(new)) = (
        body.current_password.filter(|p| !p.is_empty()),
        body.new_password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::validation(
            "Current password and new password are required.",
        ));
    };

    state
        .auth()
        .change_password(user.id, &current, &new)
        .await
        .map_err(|e| match e {
            AuthError::WeakPassword(w) => AppError::validation(new_password_message(w)),
            other => other.into(),
        })?;

    tracing::info!("Password updated");
    Ok(Json(json!({ "message": "Password updated successfully." })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_address_rejects_non_string_fields() {
        let raw = json!({"firstName": "Mara", "postalCode": 69001});
        let err = profile_address(Some(&raw)).unwrap_err();
        assert_eq!(err.to_string(), "Invalid postalCode format.");
    }

    #[test]
    fn test_profile_address_null_clears() {
        assert_eq!(profile_address(Some(&Value::Null)).unwrap(), None);
        assert_eq!(profile_address(None).unwrap(), None);
    }

    #[test]
    fn test_new_password_messages() {
        assert_eq!(
            new_password_message(WeakPassword::TooShort(8)),
            "New password must be at least 8 characters long."
        );
        assert_eq!(
            new_password_message(WeakPassword::MissingDigit),
            "New password must contain at least one numeric digit."
        );
    }
}
