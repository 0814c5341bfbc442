//! Order domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use aerox_core::{OrderId, OrderLine, OrderStatus, ShippingAddress, UserId};

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    /// `None` for guest orders.
    #[serde(skip)]
    pub user_id: Option<UserId>,
    pub items: Vec<OrderLine>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
    pub shipping_address: ShippingAddress,
    pub is_paid: bool,
    pub status: OrderStatus,
    #[serde(skip)]
    pub payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Data for writing an order. The id is assigned by the order writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: Option<UserId>,
    pub items: Vec<OrderLine>,
    pub total_price: Decimal,
    pub shipping_address: ShippingAddress,
    pub is_paid: bool,
    pub status: OrderStatus,
}

impl NewOrder {
    /// A paid order in the initial `processed` state.
    #[must_use]
    pub fn paid(
        user_id: Option<UserId>,
        items: Vec<OrderLine>,
        total_price: Decimal,
        shipping_address: ShippingAddress,
    ) -> Self {
        Self {
            user_id,
            items,
            total_price,
            shipping_address,
            is_paid: true,
            status: OrderStatus::Processed,
        }
    }
}
