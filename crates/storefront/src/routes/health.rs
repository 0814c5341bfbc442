//! Health and fallback handlers.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::{Value, json};

use crate::state::AppState;

/// Liveness: the process is up. Does not check dependencies.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "operational",
        "timestamp": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
    }))
}

/// Readiness: 503 while the store is unreachable.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.users().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Any route not matched above.
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Endpoint not found." })),
    )
}
