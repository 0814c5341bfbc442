//! `PostgreSQL` user store.
//!
//! Queries are checked at runtime (`query_as` + `FromRow`), so the crate
//! builds without a live database or offline query cache.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use aerox_core::{Email, ShippingAddress, UserId};

use super::{RepositoryError, UserStore, map_unique_violation};
use crate::models::{NewUser, User};

const USER_COLUMNS: &str = "id, email, name, shipping_address, created_at, updated_at";

/// Row shape of `storefront.user` without the password hash.
#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    email: String,
    name: Option<String>,
    shipping_address: Option<Json<ShippingAddress>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct UserWithHashRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            email,
            name: row.name,
            shipping_address: row.shipping_address.map(|Json(address)| address),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// User store backed by the `storefront.user` table.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Create a new user store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM storefront.user WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM storefront.user WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithHashRow>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM storefront.user WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some((User::try_from(r.user)?, r.password_hash))),
            None => Ok(None),
        }
    }

    async fn get_password_hash_by_id(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        let hash = sqlx::query_scalar::<_, String>(
            "SELECT password_hash FROM storefront.user WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(hash)
    }

    async fn create(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            INSERT INTO storefront.user (email, password_hash, name, shipping_address)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(user.name.as_deref())
        .bind(user.shipping_address.as_ref().map(Json))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "email"))?;

        User::try_from(row)
    }

    async fn create_or_get(&self, user: &NewUser) -> Result<(User, bool), RepositoryError> {
        let inserted = sqlx::query_as::<_, UserRow>(&format!(
            r"
            INSERT INTO storefront.user (email, password_hash, name, shipping_address)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO NOTHING
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(user.name.as_deref())
        .bind(user.shipping_address.as_ref().map(Json))
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            return Ok((User::try_from(row)?, true));
        }

        // Lost the race (or the account predates this request): reuse it.
        let existing = self
            .get_by_email(&user.email)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        Ok((existing, false))
    }

    async fn update_profile(
        &self,
        id: UserId,
        name: Option<&str>,
        shipping_address: Option<&ShippingAddress>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.user
            SET name = $2, shipping_address = $3, updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(name)
        .bind(shipping_address.map(Json))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE storefront.user SET password_hash = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
