//! Command implementations.

pub mod migrate;
pub mod orders;
pub mod seed;
pub mod sessions;

use secrecy::SecretString;
use sqlx::SqlitePool;
use thiserror::Error;

use balance_botanica_storefront::db::{self, RepositoryError};
use balance_botanica_storefront::services::auth::AuthError;
use balance_botanica_storefront::services::orders::OrderError;
use balance_botanica_storefront::services::products::ProductError;

/// Errors from CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Product {id}: {source}")]
    Product { id: String, source: ProductError },

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Session error: {0}")]
    Session(#[from] AuthError),
}

/// Open the database named by `BB_DATABASE_URL` (or `DATABASE_URL`).
///
/// # Errors
///
/// Returns `CommandError` if neither variable is set or the file cannot be
/// opened.
pub async fn connect() -> Result<SqlitePool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("BB_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("BB_DATABASE_URL"))?;

    let pool = db::create_pool(&database_url)
        .await
        .map_err(RepositoryError::from)?;
    tracing::info!("Connected to database");
    Ok(pool)
}
