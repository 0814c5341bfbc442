//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Client-facing bodies are JSON `{error, code?, details?}`. Webhook
//! signature failures are the exception: Stripe expects a plain-text body.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use aerox_core::AddressError;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::checkout::CheckoutError;
use crate::services::fulfillment::FulfillmentError;
use crate::services::identity::IdentityError;
use crate::services::orders::OrderError;
use crate::stripe::{MetadataError, WebhookError};

/// Code sent with the 409 for an already-registered checkout email.
pub const EMAIL_EXISTS_CODE: &str = "EMAIL_EXISTS";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Client input failed validation.
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<Vec<String>>,
    },

    /// Request conflicts with existing state.
    #[error("{message}")]
    Conflict {
        message: String,
        code: Option<&'static str>,
    },

    /// User is not authenticated.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but not allowed.
    #[error("{0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Webhook delivery failed signature verification.
    #[error("Webhook Error: {0}")]
    InvalidSignature(#[from] WebhookError),

    /// The payment processor refused or failed.
    #[error("Payment processor error: {0}")]
    PaymentProcessor(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a [String]>,
}

impl AppError {
    /// A 400 with just a message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: None,
        }
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::InvalidSignature(_) => StatusCode::BAD_REQUEST,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PaymentProcessor(_) | Self::Database(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::InvalidSignature(_) => return (status, self.to_string()).into_response(),
            Self::PaymentProcessor(_) => "Failed to create payment intent.".to_string(),
            Self::Database(_) | Self::Internal(_) => "Internal server error.".to_string(),
            _ => self.to_string(),
        };

        let (code, details) = match &self {
            Self::Conflict { code, .. } => (*code, None),
            Self::Validation { details, .. } => (None, details.as_deref()),
            _ => (None, None),
        };

        (
            status,
            Json(ErrorBody {
                error: &message,
                code,
                details,
            }),
        )
            .into_response()
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session error: {err}"))
    }
}

impl From<AddressError> for AppError {
    fn from(err: AddressError) -> Self {
        Self::validation(err.to_string())
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials | AuthError::WeakPassword(_) => {
                Self::validation(err.to_string())
            }
            AuthError::InvalidEmail(_) => Self::validation("Invalid email address."),
            AuthError::InvalidCredentials | AuthError::IncorrectCurrentPassword => {
                Self::Unauthorized(err.to_string())
            }
            AuthError::UserNotFound => Self::NotFound(err.to_string()),
            AuthError::UserAlreadyExists => Self::Conflict {
                message: err.to_string(),
                code: None,
            },
            AuthError::Repository(e) => Self::Database(e),
            AuthError::PasswordHash => Self::Internal(err.to_string()),
        }
    }
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::WeakPassword(e) => Self::validation(e.to_string()),
            IdentityError::InvalidEmail(_) => {
                Self::validation("A valid email address is required to create an account.")
            }
            IdentityError::EmailExists => Self::Conflict {
                message: err.to_string(),
                code: Some(EMAIL_EXISTS_CODE),
            },
            IdentityError::Repository(e) => Self::Database(e),
            IdentityError::UnknownUser | IdentityError::PasswordHash => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::NotFound => Self::NotFound(err.to_string()),
            OrderError::Forbidden => Self::Forbidden(err.to_string()),
            OrderError::AlreadyInitiated => Self::validation(err.to_string()),
            OrderError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::InvalidItems(details) => Self::Validation {
                message: "Invalid items in order.".to_string(),
                details: Some(details),
            },
            CheckoutError::Address(e) => e.into(),
            CheckoutError::Identity(e) => e.into(),
            CheckoutError::Order(e) => e.into(),
            CheckoutError::Metadata(MetadataError::TooLarge(_)) => {
                Self::validation("Order has too many items for online payment.")
            }
            CheckoutError::Metadata(e) => Self::Internal(e.to_string()),
            CheckoutError::AmountOutOfRange(_) => Self::validation(err.to_string()),
            CheckoutError::Processor(e) => Self::PaymentProcessor(e.to_string()),
        }
    }
}

impl From<FulfillmentError> for AppError {
    fn from(err: FulfillmentError) -> Self {
        match err {
            FulfillmentError::Identity(IdentityError::Repository(e))
            | FulfillmentError::Order(OrderError::Repository(e)) => Self::Database(e),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use serde_json::Value;

    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_invalid_items_carry_details() {
        let err = AppError::from(CheckoutError::InvalidItems(vec![
            "Unknown product ID: prod_999".to_string(),
        ]));
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid items in order.");
        assert_eq!(body["details"][0], "Unknown product ID: prod_999");
        assert!(body.get("code").is_none());
    }

    #[tokio::test]
    async fn test_email_exists_code() {
        let (status, body) = body_json(IdentityError::EmailExists.into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], EMAIL_EXISTS_CODE);
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let err = AppError::Database(RepositoryError::DataCorruption("bad row 7".to_string()));
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error.");

        let err = AppError::PaymentProcessor("card_declined".to_string());
        let (_, body) = body_json(err).await;
        assert_eq!(body["error"], "Failed to create payment intent.");
    }

    #[test]
    fn test_order_error_status_codes() {
        let status = |e: OrderError| AppError::from(e).into_response().status();
        assert_eq!(status(OrderError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status(OrderError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(status(OrderError::AlreadyInitiated), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_webhook_error_is_plain_text() {
        let response = AppError::from(WebhookError::SignatureMismatch).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(
            String::from_utf8(bytes.to_vec())
                .unwrap()
                .starts_with("Webhook Error: ")
        );
    }
}
