//! Database operations for the storefront SQLite file.
//!
//! # Tables
//!
//! - `users` - Customers, keyed by the identity provider's user id
//! - `sessions` - Server-side sessions (hashed cookie tokens)
//! - `products` - Catalogue, prices in minor units, stock counts
//! - `delivery_addresses` - Saved delivery contacts per user
//! - `orders` / `order_items` - Placed orders with price snapshots
//!
//! Timestamps are stored as unix milliseconds.
//!
//! # Migrations
//!
//! Migrations are embedded from `crates/storefront/migrations/` and run at
//! start-up, or manually via:
//! ```bash
//! cargo run -p balance-botanica-cli -- migrate
//! ```

pub mod addresses;
pub mod orders;
pub mod products;
pub mod sessions;
pub mod users;

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use thiserror::Error;

pub use addresses::AddressRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use sessions::SessionRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
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

impl RepositoryError {
    /// Map a unique-constraint violation to `Conflict`, anything else to `Database`.
    pub(crate) fn unique_violation(e: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::Conflict(format!("{what} already exists"));
        }
        Self::Database(e)
    }
}

/// Create a SQLite connection pool.
///
/// The database file is created if it does not exist. Connections run in WAL
/// mode with foreign keys enforced and a 5 second busy timeout, so writers
/// queue briefly instead of failing with `SQLITE_BUSY`.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL is malformed or the file cannot be opened.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url.expose_secret())?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
}

/// Apply the embedded migrations.
///
/// # Errors
///
/// Returns `sqlx::migrate::MigrateError` if a migration fails or the
/// applied history does not match the embedded files.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Create a migrated in-memory database.
///
/// Uses a single connection that never expires: every connection to
/// `sqlite::memory:` opens a fresh, empty database.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the pool or migrations fail.
#[cfg(any(test, feature = "test-support"))]
pub async fn create_memory_pool() -> Result<SqlitePool, RepositoryError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    run_migrations(&pool)
        .await
        .map_err(|e| RepositoryError::Database(sqlx::Error::Migrate(Box::new(e))))?;
    Ok(pool)
}

/// Current time as stored in the database.
pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert a stored timestamp back to `DateTime<Utc>`.
pub(crate) fn from_millis(millis: i64) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        RepositoryError::DataCorruption(format!("timestamp out of range: {millis}"))
    })
}
