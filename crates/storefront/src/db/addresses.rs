//! Delivery address repository.

use sqlx::SqlitePool;

use balance_botanica_core::{AddressId, PhoneNumber, UserId};

use super::{RepositoryError, from_millis, now_millis};
use crate::models::DeliveryAddress;

#[derive(sqlx::FromRow)]
struct AddressRow {
    id: String,
    user_id: String,
    recipient_name: String,
    phone: String,
    city: String,
    address_line: String,
    postal_code: Option<String>,
    created_at: i64,
}

impl TryFrom<AddressRow> for DeliveryAddress {
    type Error = RepositoryError;

    fn try_from(row: AddressRow) -> Result<Self, Self::Error> {
        let phone = PhoneNumber::parse(&row.phone).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid phone in address {}: {e}", row.id))
        })?;

        Ok(Self {
            id: AddressId::new(row.id),
            user_id: UserId::new(row.user_id),
            recipient_name: row.recipient_name,
            phone,
            city: row.city,
            address_line: row.address_line,
            postal_code: row.postal_code,
            created_at: from_millis(row.created_at)?,
        })
    }
}

const ADDRESS_COLUMNS: &str =
    "id, user_id, recipient_name, phone, city, address_line, postal_code, created_at";

/// Repository for saved delivery addresses.
pub struct AddressRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// All addresses of a user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<DeliveryAddress>, RepositoryError> {
        let rows: Vec<AddressRow> = sqlx::query_as(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM delivery_addresses \
             WHERE user_id = ? ORDER BY created_at, id"
        ))
        .bind(user_id.as_str())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(DeliveryAddress::try_from).collect()
    }

    /// Insert an address with a fresh UUID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        user_id: &UserId,
        recipient_name: &str,
        phone: &PhoneNumber,
        city: &str,
        address_line: &str,
        postal_code: Option<&str>,
    ) -> Result<DeliveryAddress, RepositoryError> {
        let row: AddressRow = sqlx::query_as(&format!(
            "INSERT INTO delivery_addresses \
             (id, user_id, recipient_name, phone, city, address_line, postal_code, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(user_id.as_str())
        .bind(recipient_name)
        .bind(phone.as_str())
        .bind(city)
        .bind(address_line)
        .bind(postal_code)
        .bind(now_millis())
        .fetch_one(self.pool)
        .await?;

        DeliveryAddress::try_from(row)
    }

    /// Delete an address owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such address belongs to the user.
    pub async fn delete(&self, user_id: &UserId, id: &AddressId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM delivery_addresses WHERE id = ? AND user_id = ?")
            .bind(id.as_str())
            .bind(user_id.as_str())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
