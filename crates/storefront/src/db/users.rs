//! User repository.

use sqlx::SqlitePool;

use balance_botanica_core::{Email, PhoneNumber, UserId};

use super::{RepositoryError, from_millis, now_millis};
use crate::models::{NewUser, User};

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let phone = row
            .phone
            .as_deref()
            .map(PhoneNumber::parse)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid phone in database: {e}"))
            })?;

        Ok(Self {
            id: UserId::new(row.id),
            email,
            first_name: row.first_name,
            last_name: row.last_name,
            phone,
            created_at: from_millis(row.created_at)?,
            updated_at: from_millis(row.updated_at)?,
        })
    }
}

const USER_COLUMNS: &str = "id, email, first_name, last_name, phone, created_at, updated_at";

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
                .bind(id.as_str())
                .fetch_optional(self.pool)
                .await?;

        row.map(User::try_from).transpose()
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
                .bind(email.as_str())
                .fetch_optional(self.pool)
                .await?;

        row.map(User::try_from).transpose()
    }

    /// Insert a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the id or email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let now = now_millis();
        let row: UserRow = sqlx::query_as(&format!(
            "INSERT INTO users (id, email, first_name, last_name, phone, created_at, updated_at) \
             VALUES (?, ?, ?, ?, NULL, ?, ?) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id.as_str())
        .bind(user.email.as_str())
        .bind(user.first_name.as_deref())
        .bind(user.last_name.as_deref())
        .bind(now)
        .bind(now)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "user"))?;

        User::try_from(row)
    }

    /// Overwrite the editable profile fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_profile(
        &self,
        id: &UserId,
        first_name: Option<&str>,
        last_name: Option<&str>,
        phone: Option<&PhoneNumber>,
    ) -> Result<User, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "UPDATE users SET first_name = ?, last_name = ?, phone = ?, updated_at = ? \
             WHERE id = ? \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(first_name)
        .bind(last_name)
        .bind(phone.map(PhoneNumber::as_str))
        .bind(now_millis())
        .bind(id.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from)
            .transpose()?
            .ok_or(RepositoryError::NotFound)
    }

    /// Count all users.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;

    fn new_user(id: &str, email: &str) -> NewUser {
        NewUser {
            id: UserId::new(id),
            email: Email::parse(email).unwrap(),
            first_name: Some("Olena".to_owned()),
            last_name: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let pool = create_memory_pool().await.unwrap();
        let repo = UserRepository::new(&pool);

        let created = repo.create(&new_user("u1", "olena@example.com")).await.unwrap();
        assert_eq!(created.id.as_str(), "u1");

        let fetched = repo.get_by_id(&UserId::new("u1")).await.unwrap().unwrap();
        assert_eq!(fetched.email, created.email);
        assert_eq!(fetched.first_name.as_deref(), Some("Olena"));

        let by_email = repo
            .get_by_email(&Email::parse("OLENA@example.com").unwrap())
            .await
            .unwrap();
        assert!(by_email.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_id_and_email_conflict() {
        let pool = create_memory_pool().await.unwrap();
        let repo = UserRepository::new(&pool);
        repo.create(&new_user("u1", "a@example.com")).await.unwrap();

        let same_id = repo.create(&new_user("u1", "b@example.com")).await;
        assert!(matches!(same_id, Err(RepositoryError::Conflict(_))));

        let same_email = repo.create(&new_user("u2", "a@example.com")).await;
        assert!(matches!(same_email, Err(RepositoryError::Conflict(_))));

        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_profile_missing_user() {
        let pool = create_memory_pool().await.unwrap();
        let repo = UserRepository::new(&pool);
        let result = repo
            .update_profile(&UserId::new("ghost"), Some("A"), None, None)
            .await;
        assert!(matches!(result, Err(RepositoryError::NotFound)));
    }
}
