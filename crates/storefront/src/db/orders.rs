//! `PostgreSQL` order store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;

use aerox_core::{OrderId, OrderLine, OrderStatus, ShippingAddress, UserId};

use super::{OrderStore, RepositoryError};
use crate::models::{NewOrder, Order};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: Option<UserId>,
    items: Json<Vec<OrderLine>>,
    total_price: Decimal,
    shipping_address: Json<ShippingAddress>,
    is_paid: bool,
    status: OrderStatus,
    payment_intent_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            items: row.items.0,
            total_price: row.total_price,
            shipping_address: row.shipping_address.0,
            is_paid: row.is_paid,
            status: row.status,
            payment_intent_id: row.payment_intent_id,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OwnerRow {
    user_id: Option<UserId>,
    status: OrderStatus,
}

/// Order store backed by the `storefront.order` table.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    /// Create a new order store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert(&self, id: OrderId, order: &NewOrder) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.order
                (id, user_id, items, total_price, shipping_address, is_paid, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(id)
        .bind(order.user_id)
        .bind(Json(&order.items))
        .bind(order.total_price)
        .bind(Json(&order.shipping_address))
        .bind(order.is_paid)
        .bind(order.status)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_for_payment_intent(
        &self,
        id: OrderId,
        payment_intent_id: &str,
        order: &NewOrder,
    ) -> Result<OrderId, RepositoryError> {
        let inserted = sqlx::query_scalar::<_, OrderId>(
            r"
            INSERT INTO storefront.order
                (id, user_id, items, total_price, shipping_address, is_paid, status, payment_intent_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (payment_intent_id) DO NOTHING
            RETURNING id
            ",
        )
        .bind(id)
        .bind(order.user_id)
        .bind(Json(&order.items))
        .bind(order.total_price)
        .bind(Json(&order.shipping_address))
        .bind(order.is_paid)
        .bind(order.status)
        .bind(payment_intent_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(id) = inserted {
            return Ok(id);
        }

        self.find_by_payment_intent(payment_intent_id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<OrderId>, RepositoryError> {
        let id = sqlx::query_scalar::<_, OrderId>(
            "SELECT id FROM storefront.order WHERE payment_intent_id = $1",
        )
        .bind(payment_intent_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(id)
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, user_id, items, total_price, shipping_address, is_paid, status,
                   payment_intent_id, created_at
            FROM storefront.order
            WHERE user_id = $1
            ORDER BY created_at DESC
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Order::from).collect())
    }

    async fn owner_and_status(
        &self,
        id: OrderId,
    ) -> Result<Option<(Option<UserId>, OrderStatus)>, RepositoryError> {
        let row = sqlx::query_as::<_, OwnerRow>(
            "SELECT user_id, status FROM storefront.order WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| (r.user_id, r.status)))
    }

    async fn initiate_return(&self, id: OrderId, user_id: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.order
            SET status = 'return_initiated', updated_at = now()
            WHERE id = $1 AND user_id = $2 AND status = 'processed'
            ",
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
