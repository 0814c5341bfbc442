//! Order writer.
//!
//! Orders are written once and never repriced: items and the shipping
//! address are stored as snapshots, and the total is whatever the caller
//! validated. The only later change is the one-way
//! `processed -> return_initiated` transition.

use std::sync::Arc;

use aerox_core::{OrderId, UserId};

use crate::db::{OrderStore, RepositoryError};
use crate::models::{NewOrder, Order};

/// Errors from order operations.
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Order not found.")]
    NotFound,

    #[error("Access denied.")]
    Forbidden,

    #[error("Return already initiated for this order.")]
    AlreadyInitiated,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Writes and reads orders.
#[derive(Clone)]
pub struct OrderWriter {
    orders: Arc<dyn OrderStore>,
}

impl OrderWriter {
    #[must_use]
    pub fn new(orders: Arc<dyn OrderStore>) -> Self {
        Self { orders }
    }

    /// Persist an order under a fresh id.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` on store failure.
    pub async fn create(&self, order: &NewOrder) -> Result<OrderId, OrderError> {
        let id = OrderId::generate();
        self.orders.insert(id, order).await?;

        tracing::info!(
            order_id = %id,
            user_id = order.user_id.map(|u| u.as_i32()),
            total = %order.total_price,
            "Order created"
        );
        Ok(id)
    }

    /// Persist the order paid for by `payment_intent_id`, at most once.
    ///
    /// Returns the order id and whether this call wrote it.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` on store failure.
    pub async fn create_for_payment_intent(
        &self,
        payment_intent_id: &str,
        order: &NewOrder,
    ) -> Result<(OrderId, bool), OrderError> {
        let candidate = OrderId::generate();
        let id = self
            .orders
            .insert_for_payment_intent(candidate, payment_intent_id, order)
            .await?;
        let created = id == candidate;

        if created {
            tracing::info!(
                order_id = %id,
                payment_intent_id,
                user_id = order.user_id.map(|u| u.as_i32()),
                total = %order.total_price,
                "Order created from payment"
            );
        } else {
            tracing::info!(order_id = %id, payment_intent_id, "Order already exists for payment");
        }
        Ok((id, created))
    }

    /// Order already written for a payment intent, if any.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` on store failure.
    pub async fn find_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<OrderId>, OrderError> {
        Ok(self.orders.find_by_payment_intent(payment_intent_id).await?)
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` on store failure.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, OrderError> {
        Ok(self.orders.list_for_user(user_id).await?)
    }

    /// Start a return on an order owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order does not exist,
    /// `OrderError::Forbidden` if someone else owns it, and
    /// `OrderError::AlreadyInitiated` if a return was already started.
    pub async fn initiate_return(&self, order_id: OrderId, user_id: UserId) -> Result<(), OrderError> {
        if self.orders.initiate_return(order_id, user_id).await? {
            tracing::info!(order_id = %order_id, user_id = user_id.as_i32(), "Return initiated");
            return Ok(());
        }

        // Nothing matched; work out which precondition failed.
        match self.orders.owner_and_status(order_id).await? {
            None => Err(OrderError::NotFound),
            Some((owner, _)) if owner != Some(user_id) => Err(OrderError::Forbidden),
            Some(_) => Err(OrderError::AlreadyInitiated),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use aerox_core::{OrderLine, OrderStatus, ShippingAddress};

    use super::*;
    use crate::db::MemoryStore;

    fn order(user_id: Option<UserId>, total: i64) -> NewOrder {
        NewOrder::paid(
            user_id,
            vec![OrderLine {
                product_id: "prod_001".to_owned(),
                name: "HEART BEAT ARM SLEEVE".to_owned(),
                unit_price: Decimal::new(37, 0),
                quantity: 1,
                selected_size: None,
            }],
            Decimal::new(total, 0),
            ShippingAddress::default(),
        )
    }

    #[tokio::test]
    async fn test_create_assigns_fresh_ids() {
        let store = Arc::new(MemoryStore::new());
        let writer = OrderWriter::new(store.clone());

        let a = writer.create(&order(None, 37)).await.unwrap();
        let b = writer.create(&order(None, 37)).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.order_count(), 2);
    }

    #[tokio::test]
    async fn test_payment_intent_written_once() {
        let store = Arc::new(MemoryStore::new());
        let writer = OrderWriter::new(store.clone());

        let (first, created) = writer
            .create_for_payment_intent("pi_abc", &order(None, 37))
            .await
            .unwrap();
        assert!(created);

        let (second, created_again) = writer
            .create_for_payment_intent("pi_abc", &order(None, 37))
            .await
            .unwrap();
        assert!(!created_again);
        assert_eq!(first, second);
        assert_eq!(store.order_count(), 1);
    }

    #[tokio::test]
    async fn test_return_outcomes() {
        let store = Arc::new(MemoryStore::new());
        let writer = OrderWriter::new(store.clone());
        let owner = UserId::new(1);
        let id = writer.create(&order(Some(owner), 37)).await.unwrap();

        assert!(matches!(
            writer.initiate_return(OrderId::generate(), owner).await,
            Err(OrderError::NotFound)
        ));
        assert!(matches!(
            writer.initiate_return(id, UserId::new(2)).await,
            Err(OrderError::Forbidden)
        ));
        writer.initiate_return(id, owner).await.unwrap();
        assert!(matches!(
            writer.initiate_return(id, owner).await,
            Err(OrderError::AlreadyInitiated)
        ));

        let orders = writer.list_for_user(owner).await.unwrap();
        assert_eq!(orders[0].status, OrderStatus::ReturnInitiated);
    }

    #[tokio::test]
    async fn test_guest_order_cannot_be_returned() {
        let store = Arc::new(MemoryStore::new());
        let writer = OrderWriter::new(store);
        let id = writer.create(&order(None, 37)).await.unwrap();
        assert!(matches!(
            writer.initiate_return(id, UserId::new(1)).await,
            Err(OrderError::Forbidden)
        ));
    }
}
