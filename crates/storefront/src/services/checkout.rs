//! Checkout orchestration.
//!
//! Every entry point runs the same front half: price the cart, require a
//! complete shipping address, then work out who is buying. They differ in
//! what happens next:
//!
//! - [`CheckoutService::checkout`]: signed-in only, order written as paid.
//! - [`CheckoutService::smart_checkout`]: any actor, order written as paid,
//!   account created on the spot when requested.
//! - [`CheckoutService::create_payment_intent`]: nothing is written; the
//!   order travels in the intent metadata and is fulfilled by the webhook.
//!
//! The two immediate paths record payment on the caller's word and exist
//! for flows that settle outside the processor.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use aerox_core::{AddressError, CurrencyCode, OrderId, Price, ShippingAddress, UserId};

use crate::catalog::Catalog;
use crate::config::CheckoutPolicy;
use crate::models::{CurrentUser, NewOrder};
use crate::services::identity::{IdentityError, IdentityResolver};
use crate::services::orders::{OrderError, OrderWriter};
use crate::services::pricing::{self, PriceValidation};
use crate::stripe::{IntentRequest, MetadataError, PaymentMetadata, PaymentProcessor, StripeError};

/// Errors from the checkout pipeline.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    /// At least one cart line was rejected.
    #[error("Invalid items in order.")]
    InvalidItems(Vec<String>),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error("order total {0} cannot be charged")]
    AmountOutOfRange(Decimal),

    #[error(transparent)]
    Processor(#[from] StripeError),
}

/// Body shared by the checkout endpoints.
///
/// Fields stay loosely typed so that shape problems surface as the
/// validation messages below rather than as extractor rejections.
#[derive(Debug, Default, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub items: Option<Value>,
    #[serde(default)]
    pub shipping_address: Option<Value>,
    #[serde(default)]
    pub password: Option<Value>,
}

impl CheckoutRequest {
    fn password(&self) -> Option<&str> {
        self.password.as_ref().and_then(Value::as_str)
    }
}

/// A written order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub total: Decimal,
    pub user_id: Option<UserId>,
    pub is_new_account: bool,
    /// Set when the checkout created an account the shopper should be
    /// logged in to.
    pub new_session: Option<CurrentUser>,
}

/// Validated front half of a checkout.
struct Prepared {
    pricing: PriceValidation,
    address: ShippingAddress,
}

/// Runs the checkout pipeline.
#[derive(Clone)]
pub struct CheckoutService {
    catalog: Arc<Catalog>,
    identity: IdentityResolver,
    orders: OrderWriter,
    processor: Arc<dyn PaymentProcessor>,
    policy: CheckoutPolicy,
    currency: CurrencyCode,
}

impl CheckoutService {
    #[must_use]
    pub fn new(
        catalog: Arc<Catalog>,
        identity: IdentityResolver,
        orders: OrderWriter,
        processor: Arc<dyn PaymentProcessor>,
        policy: CheckoutPolicy,
        currency: CurrencyCode,
    ) -> Self {
        Self {
            catalog,
            identity,
            orders,
            processor,
            policy,
            currency,
        }
    }

    /// Signed-in checkout, recorded as paid immediately.
    ///
    /// # Errors
    ///
    /// Returns a `CheckoutError` describing the first failed step.
    pub async fn checkout(
        &self,
        user: &CurrentUser,
        request: &CheckoutRequest,
    ) -> Result<PlacedOrder, CheckoutError> {
        let prepared = self.prepare(request)?;
        let actor = self.identity.classify(Some(user), None, &prepared.address)?;
        let resolution = self.identity.resolve(actor, &prepared.address).await?;

        self.write(prepared, resolution.user_id, resolution.is_new_account, None)
            .await
    }

    /// Checkout for any actor, recorded as paid immediately.
    ///
    /// # Errors
    ///
    /// Returns a `CheckoutError` describing the first failed step.
    pub async fn smart_checkout(
        &self,
        session: Option<&CurrentUser>,
        request: &CheckoutRequest,
    ) -> Result<PlacedOrder, CheckoutError> {
        let prepared = self.prepare(request)?;
        let actor = self
            .identity
            .classify(session, request.password(), &prepared.address)?;
        let resolution = self.identity.resolve(actor, &prepared.address).await?;

        self.write(
            prepared,
            resolution.user_id,
            resolution.is_new_account,
            resolution.new_session,
        )
        .await
    }

    /// Create a payment intent for the cart and return its client secret.
    ///
    /// No order or user row is written here.
    ///
    /// # Errors
    ///
    /// Returns a `CheckoutError` describing the first failed step.
    pub async fn create_payment_intent(
        &self,
        session: Option<&CurrentUser>,
        request: &CheckoutRequest,
    ) -> Result<String, CheckoutError> {
        let prepared = self.prepare(request)?;
        let actor = self
            .identity
            .classify(session, request.password(), &prepared.address)?;
        let identity = self
            .identity
            .prepare_deferred(actor, &prepared.address)
            .await?;

        let total = prepared.pricing.total;
        let amount = Price::new(total, self.currency)
            .to_minor_units()
            .filter(|a| *a > 0)
            .ok_or(CheckoutError::AmountOutOfRange(total))?;

        let receipt_email = prepared.address.email.clone();
        let metadata = PaymentMetadata {
            lines: prepared.pricing.lines,
            shipping_address: prepared.address,
            identity,
        }
        .encode()?;

        let intent = self
            .processor
            .create_intent(&IntentRequest {
                amount,
                currency: self.currency,
                metadata,
                receipt_email: Some(receipt_email),
                idempotency_key: uuid::Uuid::new_v4().to_string(),
            })
            .await?;

        tracing::info!(
            payment_intent_id = %intent.id,
            amount,
            "Payment intent created"
        );

        intent
            .client_secret
            .ok_or(StripeError::MissingClientSecret(intent.id))
            .map_err(CheckoutError::from)
    }

    fn prepare(&self, request: &CheckoutRequest) -> Result<Prepared, CheckoutError> {
        let pricing = pricing::validate_cart(
            &self.catalog,
            request.items.as_ref(),
            self.policy.max_quantity,
        );
        if !pricing.valid {
            return Err(CheckoutError::InvalidItems(pricing.errors));
        }

        let address = parse_address(request.shipping_address.as_ref())?;
        Ok(Prepared { pricing, address })
    }

    async fn write(
        &self,
        prepared: Prepared,
        user_id: Option<UserId>,
        is_new_account: bool,
        new_session: Option<CurrentUser>,
    ) -> Result<PlacedOrder, CheckoutError> {
        let total = prepared.pricing.total;
        let order = NewOrder::paid(user_id, prepared.pricing.lines, total, prepared.address);
        let order_id = self.orders.create(&order).await?;

        Ok(PlacedOrder {
            order_id,
            total,
            user_id,
            is_new_account,
            new_session,
        })
    }
}

/// Parse and check the shipping address object.
fn parse_address(raw: Option<&Value>) -> Result<ShippingAddress, AddressError> {
    let Some(raw @ Value::Object(_)) = raw else {
        return Err(AddressError::Missing);
    };
    let address: ShippingAddress =
        serde_json::from_value(raw.clone()).map_err(|_| AddressError::Missing)?;
    address.validate_required()?;
    Ok(address)
}
