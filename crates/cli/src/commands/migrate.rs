//! Database migration commands.
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string, falling back
//!   to `DATABASE_URL`
//!
//! Schema migrations live in `crates/storefront/migrations/`. The session
//! table belongs to `tower-sessions-sqlx-store`, which ships its own DDL.

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use tower_sessions_sqlx_store::PostgresStore;

/// Errors from the migrate command.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

fn database_url() -> Result<SecretString, MigrationError> {
    std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| MigrationError::MissingEnvVar("STOREFRONT_DATABASE_URL"))
}

/// Open a pool against the storefront database.
pub async fn connect() -> Result<PgPool, MigrationError> {
    dotenvy::dotenv().ok();

    let url = database_url()?;
    tracing::info!("Connecting to storefront database...");
    Ok(PgPool::connect(url.expose_secret()).await?)
}

/// Users and orders tables.
pub async fn schema(pool: &PgPool) -> Result<(), MigrationError> {
    tracing::info!("Running schema migrations...");
    sqlx::migrate!("../storefront/migrations").run(pool).await?;
    tracing::info!("Schema migrations complete");
    Ok(())
}

/// The `tower_sessions` table used by the session layer.
pub async fn sessions(pool: &PgPool) -> Result<(), MigrationError> {
    tracing::info!("Creating session table...");
    PostgresStore::new(pool.clone()).migrate().await?;
    tracing::info!("Session table ready");
    Ok(())
}
