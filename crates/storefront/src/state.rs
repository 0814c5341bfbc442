//! Application state shared across handlers.

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::config::StorefrontConfig;
use crate::db::{OrderStore, UserStore};
use crate::services::{
    AuthService, CheckoutService, FulfillmentService, IdentityResolver, OrderWriter,
};
use crate::stripe::PaymentProcessor;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Stores and the payment
/// processor are injected, so tests run the full router against the
/// in-memory store and a fake processor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    catalog: Arc<Catalog>,
    users: Arc<dyn UserStore>,
    auth: AuthService,
    orders: OrderWriter,
    checkout: CheckoutService,
    fulfillment: FulfillmentService,
}

impl AppState {
    /// Wire the services together.
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        catalog: Catalog,
        users: Arc<dyn UserStore>,
        orders: Arc<dyn OrderStore>,
        processor: Arc<dyn PaymentProcessor>,
    ) -> Self {
        let catalog = Arc::new(catalog);
        let policy = config.checkout;
        let currency = config.stripe.currency;

        let identity = IdentityResolver::new(users.clone(), policy.password);
        let order_writer = OrderWriter::new(orders);
        let auth = AuthService::new(users.clone(), policy.password);
        let checkout = CheckoutService::new(
            catalog.clone(),
            identity.clone(),
            order_writer.clone(),
            processor,
            policy,
            currency,
        );
        let fulfillment = FulfillmentService::new(identity, order_writer.clone(), currency);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog,
                users,
                auth,
                orders: order_writer,
                checkout,
                fulfillment,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the product catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// Get a reference to the user store (readiness checks).
    #[must_use]
    pub fn users(&self) -> &dyn UserStore {
        self.inner.users.as_ref()
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    #[must_use]
    pub fn orders(&self) -> &OrderWriter {
        &self.inner.orders
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.inner.checkout
    }

    #[must_use]
    pub fn fulfillment(&self) -> &FulfillmentService {
        &self.inner.fulfillment
    }
}
