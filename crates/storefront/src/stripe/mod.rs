//! Stripe payment processor integration.
//!
//! # Architecture
//!
//! - Plain REST over `reqwest` 0.13 (form-encoded requests, JSON responses)
//! - The checkout service talks to [`PaymentProcessor`], never to the client
//!   directly, so tests swap in a recording fake
//! - Everything the webhook needs to fulfil an order travels in the
//!   payment intent's metadata ([`PaymentMetadata`])
//!
//! # Webhooks
//!
//! [`webhook::verify_signature`] checks the `Stripe-Signature` header
//! (HMAC-SHA256 over `"{timestamp}.{body}"`) before any event is parsed.

mod client;
pub mod metadata;
pub mod webhook;

pub use client::StripeClient;
pub use metadata::{MetadataError, PaymentMetadata};
pub use webhook::{Event, PaymentIntentObject, WebhookError};

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use aerox_core::CurrencyCode;

/// Errors that can occur when calling the Stripe API.
#[derive(Debug, Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe rejected the request.
    #[error("Stripe API error ({status}): {message}")]
    Api {
        /// HTTP status returned by Stripe.
        status: u16,
        /// Message from Stripe's error object, or the raw body.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The intent came back without a client secret.
    #[error("payment intent {0} has no client secret")]
    MissingClientSecret(String),
}

/// Parameters for a new payment intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentRequest {
    /// Amount in minor units (cents).
    pub amount: i64,
    pub currency: CurrencyCode,
    /// Flat key/value metadata, already encoded.
    pub metadata: BTreeMap<String, String>,
    pub receipt_email: Option<String>,
    /// Sent as the `Idempotency-Key` header.
    pub idempotency_key: String,
}

/// A created payment intent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedIntent {
    pub id: String,
    pub client_secret: Option<String>,
}

/// Something that can create payment intents.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Create a payment intent.
    async fn create_intent(&self, request: &IntentRequest) -> Result<CreatedIntent, StripeError>;
}
