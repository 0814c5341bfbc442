//! Persistence for storefront users and orders.
//!
//! # Database: `aerox_storefront`
//!
//! ## Tables
//!
//! - `storefront.user` - Customer accounts (email is unique)
//! - `storefront.order` - Orders with JSON item/address snapshots
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! Handlers never see a pool directly. They go through the [`UserStore`] and
//! [`OrderStore`] traits held in [`crate::state::AppState`], backed by
//! [`PgUserStore`]/[`PgOrderStore`] in production and [`MemoryStore`] in tests.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p aerox-cli -- migrate all
//! ```

pub mod memory;
pub mod orders;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use aerox_core::{Email, OrderId, OrderStatus, ShippingAddress, UserId};

use crate::models::{NewOrder, NewUser, Order, User};

pub use memory::MemoryStore;
pub use orders::PgOrderStore;
pub use users::PgUserStore;

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Access to customer accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Get a user by their ID.
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Get a user by their email address.
    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// Get a user together with their password hash, for login.
    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Get only the password hash of a user, for re-verification.
    async fn get_password_hash_by_id(&self, id: UserId) -> Result<Option<String>, RepositoryError>;

    /// Insert a user.
    ///
    /// Returns `RepositoryError::Conflict` if the email is already taken.
    async fn create(&self, user: &NewUser) -> Result<User, RepositoryError>;

    /// Insert a user unless the email is taken, in which case the existing
    /// row is returned. The flag is `true` only when this call inserted.
    ///
    /// Concurrent callers with the same email observe exactly one `true`.
    async fn create_or_get(&self, user: &NewUser) -> Result<(User, bool), RepositoryError>;

    /// Replace a user's display name and stored shipping address.
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    async fn update_profile(
        &self,
        id: UserId,
        name: Option<&str>,
        shipping_address: Option<&ShippingAddress>,
    ) -> Result<(), RepositoryError>;

    /// Replace a user's password hash.
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    async fn update_password(&self, id: UserId, password_hash: &str)
    -> Result<(), RepositoryError>;

    /// Cheap round-trip used by the readiness check.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Access to orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert an order under a caller-chosen id.
    async fn insert(&self, id: OrderId, order: &NewOrder) -> Result<(), RepositoryError>;

    /// Insert an order keyed by a payment-intent id.
    ///
    /// If an order already exists for `payment_intent_id`, nothing is
    /// written and the existing order's id is returned instead of `id`.
    async fn insert_for_payment_intent(
        &self,
        id: OrderId,
        payment_intent_id: &str,
        order: &NewOrder,
    ) -> Result<OrderId, RepositoryError>;

    /// Id of the order created for a payment intent, if any.
    async fn find_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<OrderId>, RepositoryError>;

    /// All orders of a user, newest first.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// Owner and status of an order, if it exists.
    async fn owner_and_status(
        &self,
        id: OrderId,
    ) -> Result<Option<(Option<UserId>, OrderStatus)>, RepositoryError>;

    /// Move an order from `processed` to `return_initiated` in one
    /// conditional write. Returns `true` if a row changed, i.e. the order
    /// exists, belongs to `user_id`, and was still `processed`.
    async fn initiate_return(&self, id: OrderId, user_id: UserId) -> Result<bool, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map a unique-constraint violation to `RepositoryError::Conflict`.
pub(crate) fn map_unique_violation(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}
