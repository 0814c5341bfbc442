//! Stripe webhook endpoint.
//!
//! Takes the raw body: the signature covers the exact bytes Stripe sent, so
//! nothing may parse or re-encode them first.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use secrecy::ExposeSecret;
use serde_json::{Value, json};
use tracing::{Span, instrument};

use crate::error::Result;
use crate::state::AppState;
use crate::stripe::webhook::{self, PAYMENT_FAILED, PAYMENT_SUCCEEDED};
use crate::stripe::{Event, WebhookError};

/// Header carrying the Stripe signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// POST /webhook
///
/// # Errors
///
/// 400 if the signature does not verify. 500 if fulfillment fails, so
/// Stripe redelivers.
#[instrument(skip_all, fields(event_id, event_type))]
pub async fn handle(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MissingHeader)?;

    let stripe = &state.config().stripe;
    webhook::verify_signature(
        &body,
        signature,
        stripe.webhook_secret.expose_secret(),
        stripe.webhook_tolerance_secs,
        chrono::Utc::now().timestamp(),
    )
    .inspect_err(|e| tracing::warn!(error = %e, "Webhook signature verification failed"))?;

    let event = Event::parse(&body)?;
    let span = Span::current();
    span.record("event_id", event.id.as_str());
    span.record("event_type", event.event_type.as_str());

    match event.event_type.as_str() {
        PAYMENT_SUCCEEDED => {
            let intent = event.payment_intent()?;
            let outcome = state.fulfillment().payment_succeeded(&intent).await?;
            tracing::info!(
                order_id = %outcome.order_id,
                created = outcome.created,
                "Payment fulfilled"
            );
        }
        PAYMENT_FAILED => {
            let intent = event.payment_intent()?;
            let reason = intent
                .last_payment_error
                .and_then(|e| e.message)
                .unwrap_or_default();
            tracing::warn!(payment_intent_id = %intent.id, %reason, "Payment failed");
        }
        other => tracing::debug!(event_type = other, "Ignoring webhook event"),
    }

    Ok(Json(json!({ "received": true })))
}
