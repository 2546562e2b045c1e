//! Database migration command.
//!
//! Applies the migrations embedded from `crates/storefront/migrations/`.
//! The storefront binary runs the same set on start-up.

use sqlx::SqlitePool;

use super::CommandError;
use balance_botanica_storefront::db;

/// Apply pending migrations.
///
/// # Errors
///
/// Returns `CommandError::Migration` if a migration fails.
pub async fn run(pool: &SqlitePool) -> Result<(), CommandError> {
    tracing::info!("Running storefront migrations...");
    db::run_migrations(pool).await?;
    tracing::info!("Migrations complete");
    Ok(())
}
