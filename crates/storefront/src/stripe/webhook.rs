//! Stripe webhook signature verification and event types.

use std::collections::HashMap;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Event type that triggers fulfillment.
pub const PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";
/// Event type logged as a failed payment.
pub const PAYMENT_FAILED: &str = "payment_intent.payment_failed";

/// Why a webhook delivery was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WebhookError {
    #[error("No stripe-signature header value was provided.")]
    MissingHeader,

    #[error("Unable to extract timestamp and signatures from header")]
    MalformedHeader,

    #[error("No signatures found matching the expected signature for payload")]
    SignatureMismatch,

    #[error("Timestamp outside the tolerance zone")]
    TimestampOutsideTolerance,

    #[error("Invalid event payload: {0}")]
    InvalidPayload(String),
}

/// A verified Stripe event. Only the fields this service reads are typed.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

/// The `data.object` of a `payment_intent.*` event.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntentObject {
    pub id: String,
    /// Amount in minor units.
    pub amount: i64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub last_payment_error: Option<LastPaymentError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LastPaymentError {
    #[serde(default)]
    pub message: Option<String>,
}

impl Event {
    /// Parse an already verified payload.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::InvalidPayload` if the body is not an event.
    pub fn parse(payload: &[u8]) -> Result<Self, WebhookError> {
        serde_json::from_slice(payload).map_err(|e| WebhookError::InvalidPayload(e.to_string()))
    }

    /// Read `data.object` as a payment intent.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::InvalidPayload` if the object has another shape.
    pub fn payment_intent(&self) -> Result<PaymentIntentObject, WebhookError> {
        PaymentIntentObject::deserialize(&self.data.object)
            .map_err(|e| WebhookError::InvalidPayload(e.to_string()))
    }
}

/// Verify a `Stripe-Signature` header against the raw request body.
///
/// The header looks like `t=1700000000,v1=<hex>,v1=<hex>`. Any `v1` entry
/// matching HMAC-SHA256(secret, `"{t}.{payload}"`) is accepted, as long as
/// `t` is within `tolerance_secs` of `now`.
///
/// # Errors
///
/// Returns the reason the signature was rejected.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), WebhookError> {
    let mut timestamp: Option<&str> = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::MalformedHeader)?;
    let issued_at: i64 = timestamp
        .parse()
        .map_err(|_| WebhookError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(WebhookError::MalformedHeader);
    }

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| WebhookError::SignatureMismatch)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    // verify_slice compares in constant time
    let matched = signatures
        .iter()
        .filter_map(|sig| hex::decode(sig).ok())
        .any(|sig| mac.clone().verify_slice(&sig).is_ok());

    if !matched {
        return Err(WebhookError::SignatureMismatch);
    }

    let skew = now.checked_sub(issued_at).map(i64::unsigned_abs);
    if skew.is_none_or(|skew| skew > tolerance_secs.unsigned_abs()) {
        return Err(WebhookError::TimestampOutsideTolerance);
    }

    Ok(())
}
