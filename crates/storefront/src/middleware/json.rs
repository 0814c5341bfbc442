//! JSON body extractor whose rejections use the API error envelope.

use axum::extract::FromRequest;
use axum::extract::rejection::JsonRejection;

use crate::error::AppError;

/// `axum::Json` for request bodies, rejecting with a 400 [`AppError`]
/// instead of axum's plain-text 400/415/422 replies.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "Rejected request body");
        match rejection {
            JsonRejection::MissingJsonContentType(_) => {
                Self::validation("Request body must be JSON (Content-Type: application/json).")
            }
            JsonRejection::JsonSyntaxError(_) => Self::validation("Malformed JSON body."),
            JsonRejection::JsonDataError(e) => Self::Validation {
                message: "Invalid request body.".to_string(),
                details: Some(vec![e.body_text()]),
            },
            other => Self::validation(other.body_text()),
        }
    }
}
