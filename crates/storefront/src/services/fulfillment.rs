//! Order fulfillment for succeeded payments.
//!
//! Runs from the webhook once a `payment_intent.succeeded` event has been
//! verified. Stripe delivers at least once, so everything here tolerates
//! replays: the order is keyed by payment intent id and pending accounts are
//! upserted.

use aerox_core::{CurrencyCode, OrderId, Price};

use crate::models::NewOrder;
use crate::services::identity::{IdentityError, IdentityResolver};
use crate::services::orders::{OrderError, OrderWriter};
use crate::stripe::{MetadataError, PaymentIntentObject, PaymentMetadata};

#[derive(Debug, thiserror::Error)]
pub enum FulfillmentError {
    #[error("payment intent metadata unusable: {0}")]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Order(#[from] OrderError),

    /// Charged in a currency the store cannot convert from minor units.
    #[error("payment charged in unsupported currency: {0}")]
    UnsupportedCurrency(String),
}

/// Result of handling one succeeded payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FulfillmentOutcome {
    pub order_id: OrderId,
    /// `false` when the order already existed for this payment intent.
    pub created: bool,
}

#[derive(Clone)]
pub struct FulfillmentService {
    identity: IdentityResolver,
    orders: OrderWriter,
    currency: CurrencyCode,
}

impl FulfillmentService {
    #[must_use]
    pub const fn new(identity: IdentityResolver, orders: OrderWriter, currency: CurrencyCode) -> Self {
        Self {
            identity,
            orders,
            currency,
        }
    }

    /// Write the order for a succeeded payment intent.
    ///
    /// The order total is the amount Stripe actually charged, not a
    /// recomputation from the line snapshot.
    ///
    /// # Errors
    ///
    /// Returns `FulfillmentError` if the metadata cannot be decoded or a
    /// store call fails. The caller should answer non-2xx so Stripe retries.
    #[tracing::instrument(skip_all, fields(payment_intent_id = %intent.id))]
    pub async fn payment_succeeded(
        &self,
        intent: &PaymentIntentObject,
    ) -> Result<FulfillmentOutcome, FulfillmentError> {
        if let Some(order_id) = self.orders.find_by_payment_intent(&intent.id).await? {
            tracing::info!(%order_id, "Payment already fulfilled");
            return Ok(FulfillmentOutcome {
                order_id,
                created: false,
            });
        }

        let metadata = PaymentMetadata::decode(&intent.metadata)?;
        let total = Price::from_minor_units(intent.amount, self.charged_currency(intent)?).amount;

        let resolution = self
            .identity
            .complete_deferred(&metadata.identity, &metadata.shipping_address)
            .await?;

        let order = NewOrder::paid(
            resolution.user_id,
            metadata.lines,
            total,
            metadata.shipping_address,
        );
        let (order_id, created) = self
            .orders
            .create_for_payment_intent(&intent.id, &order)
            .await?;

        Ok(FulfillmentOutcome { order_id, created })
    }

    /// Currency the intent was actually charged in. An intent without one
    /// is taken to be in the configured currency.
    fn charged_currency(&self, intent: &PaymentIntentObject) -> Result<CurrencyCode, FulfillmentError> {
        let Some(raw) = intent.currency.as_deref() else {
            return Ok(self.currency);
        };
        let charged: CurrencyCode = raw
            .parse()
            .map_err(|_| FulfillmentError::UnsupportedCurrency(raw.to_owned()))?;
        if charged != self.currency {
            tracing::warn!(
                %charged,
                configured = %self.currency,
                "Payment currency differs from configured currency"
            );
        }
        Ok(charged)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;
    use secrecy::SecretString;

    use aerox_core::{Email, OrderLine, ShippingAddress};

    use super::*;
    use crate::config::PasswordPolicy;
    use crate::db::{MemoryStore, UserStore};
    use crate::models::NewUser;
    use crate::services::identity::{DeferredIdentity, PendingAccount};

    fn service(store: &Arc<MemoryStore>) -> FulfillmentService {
        FulfillmentService::new(
            IdentityResolver::new(store.clone(), PasswordPolicy::default()),
            OrderWriter::new(store.clone()),
            CurrencyCode::EUR,
        )
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            first_name: "Mara".to_owned(),
            last_name: "Quist".to_owned(),
            email: "mara@aero-x.dev".to_owned(),
            address: "4 Track Lane".to_owned(),
            city: "Lyon".to_owned(),
            postal_code: "69001".to_owned(),
        }
    }

    fn intent(id: &str, identity: DeferredIdentity) -> PaymentIntentObject {
        let metadata = PaymentMetadata {
            lines: vec![OrderLine {
                product_id: "prod_001".to_owned(),
                name: "CAMOUFLAGE ARM SLEEVE".to_owned(),
                unit_price: Decimal::new(37, 0),
                quantity: 2,
                selected_size: None,
            }],
            shipping_address: address(),
            identity,
        }
        .encode()
        .unwrap();

        PaymentIntentObject {
            id: id.to_owned(),
            amount: 7400,
            currency: Some("eur".to_owned()),
            metadata: metadata.into_iter().collect(),
            last_payment_error: None,
        }
    }

    fn pending() -> DeferredIdentity {
        DeferredIdentity {
            user_id: None,
            account: Some(PendingAccount {
                email: Email::parse("mara@aero-x.dev").unwrap(),
                password_hash: SecretString::from("$argon2id$v=19$m=19456,t=2,p=1$abc$def"),
            }),
        }
    }

    #[tokio::test]
    async fn test_guest_payment_writes_paid_order() {
        let store = Arc::new(MemoryStore::new());
        let outcome = service(&store)
            .payment_succeeded(&intent("pi_1", DeferredIdentity::default()))
            .await
            .unwrap();

        assert!(outcome.created);
        let orders = store.orders();
        assert_eq!(orders[0].user_id, None);
        assert_eq!(orders.len(), 1);
        assert!(orders[0].is_paid);
        assert_eq!(orders[0].total_price, Decimal::new(74, 0));
        assert_eq!(orders[0].payment_intent_id.as_deref(), Some("pi_1"));
    }

    #[tokio::test]
    async fn test_redelivery_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store);
        let first = svc.payment_succeeded(&intent("pi_1", pending())).await.unwrap();
        let second = svc.payment_succeeded(&intent("pi_1", pending())).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.order_id, second.order_id);
        assert_eq!(store.order_count(), 1);
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn test_pending_account_reuses_existing_user() {
        let store = Arc::new(MemoryStore::new());
        let existing = store
            .create(&NewUser {
                email: Email::parse("mara@aero-x.dev").unwrap(),
                password_hash: "h".to_owned(),
                name: None,
                shipping_address: None,
            })
            .await
            .unwrap();

        service(&store)
            .payment_succeeded(&intent("pi_2", pending()))
            .await
            .unwrap();
        assert_eq!(store.orders()[0].user_id, Some(existing.id));
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_metadata_fails() {
        let store = Arc::new(MemoryStore::new());
        let mut bare = intent("pi_3", DeferredIdentity::default());
        bare.metadata.clear();

        let err = service(&store).payment_succeeded(&bare).await.unwrap_err();
        assert!(matches!(err, FulfillmentError::Metadata(MetadataError::Missing(_))));
        assert_eq!(store.order_count(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_currency_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let mut yen = intent("pi_4", pending());
        yen.currency = Some("jpy".to_owned());

        let err = service(&store).payment_succeeded(&yen).await.unwrap_err();
        assert!(matches!(err, FulfillmentError::UnsupportedCurrency(ref code) if code == "jpy"));
        assert_eq!(store.order_count(), 0);
        assert_eq!(store.user_count(), 0);
    }

    #[tokio::test]
    async fn test_total_uses_charged_currency() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store);

        let mut upper = intent("pi_5", DeferredIdentity::default());
        upper.currency = Some("EUR".to_owned());
        svc.payment_succeeded(&upper).await.unwrap();

        let mut dollars = intent("pi_6", DeferredIdentity::default());
        dollars.currency = Some("usd".to_owned());
        dollars.amount = 8150;
        svc.payment_succeeded(&dollars).await.unwrap();

        let orders = store.orders();
        assert_eq!(orders.len(), 2);
        let total = |id: &str| {
            orders
                .iter()
                .find(|o| o.payment_intent_id.as_deref() == Some(id))
                .map(|o| o.total_price)
                .unwrap()
        };
        assert_eq!(total("pi_5"), Decimal::new(74, 0));
        assert_eq!(total("pi_6"), Decimal::new(8150, 2));
    }
}
