//! Stripe REST client.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{CreatedIntent, IntentRequest, PaymentProcessor, StripeError};
use crate::config::StripeConfig;

/// Client for the Stripe API.
#[derive(Clone)]
pub struct StripeClient {
    inner: Arc<StripeClientInner>,
}

struct StripeClientInner {
    client: reqwest::Client,
    api_base: String,
    secret_key: SecretString,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl StripeClient {
    /// Create a new Stripe API client.
    #[must_use]
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            inner: Arc::new(StripeClientInner {
                client: reqwest::Client::new(),
                api_base: config.api_base.trim_end_matches('/').to_string(),
                secret_key: config.secret_key.clone(),
            }),
        }
    }

    fn form_fields(request: &IntentRequest) -> Vec<(String, String)> {
        let mut fields = vec![
            ("amount".to_string(), request.amount.to_string()),
            (
                "currency".to_string(),
                request.currency.as_processor_code().to_string(),
            ),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];

        if let Some(email) = &request.receipt_email {
            fields.push(("receipt_email".to_string(), email.clone()));
        }

        for (key, value) in &request.metadata {
            fields.push((format!("metadata[{key}]"), value.clone()));
        }

        fields
    }
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    #[instrument(skip_all, fields(amount = request.amount, currency = %request.currency))]
    async fn create_intent(&self, request: &IntentRequest) -> Result<CreatedIntent, StripeError> {
        let url = format!("{}/v1/payment_intents", self.inner.api_base);

        let response = self
            .inner
            .client
            .post(&url)
            .bearer_auth(self.inner.secret_key.expose_secret())
            .header("Idempotency-Key", &request.idempotency_key)
            .form(&Self::form_fields(request))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or(body);
            warn!(status = status.as_u16(), %message, "Stripe rejected payment intent");
            return Err(StripeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let intent: CreatedIntent = serde_json::from_str(&body)?;
        debug!(payment_intent_id = %intent.id, "Payment intent created");
        Ok(intent)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use aerox_core::CurrencyCode;

    use super::*;

    #[test]
    fn test_form_fields() {
        let mut metadata = BTreeMap::new();
        metadata.insert("user_id".to_string(), "7".to_string());

        let fields = StripeClient::form_fields(&IntentRequest {
            amount: 7400,
            currency: CurrencyCode::EUR,
            metadata,
            receipt_email: Some("mara@aero-x.dev".to_string()),
            idempotency_key: "k".to_string(),
        });

        let get = |k: &str| {
            fields
                .iter()
                .find(|(key, _)| key == k)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("amount"), Some("7400"));
        assert_eq!(get("currency"), Some("eur"));
        assert_eq!(get("automatic_payment_methods[enabled]"), Some("true"));
        assert_eq!(get("receipt_email"), Some("mara@aero-x.dev"));
        assert_eq!(get("metadata[user_id]"), Some("7"));
    }
}
