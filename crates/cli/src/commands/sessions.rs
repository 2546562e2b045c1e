//! Session maintenance.

use sqlx::SqlitePool;

use super::CommandError;
use balance_botanica_storefront::services::auth::SessionService;

/// Delete every expired session.
///
/// # Errors
///
/// Returns `CommandError::Session` on storage failure.
pub async fn purge(pool: &SqlitePool) -> Result<(), CommandError> {
    let removed = SessionService::new(pool.clone()).purge_expired().await?;
    tracing::info!("Removed {removed} expired sessions");
    Ok(())
}
