//! Customer accounts, profiles and saved addresses.

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::instrument;

use balance_botanica_core::{AddressId, EmailError, PhoneError, PhoneNumber, UserId};

use super::ports::Identity;
use crate::db::{AddressRepository, RepositoryError, UserRepository};
use crate::models::{DeliveryAddress, NewAddress, NewUser, ProfileUpdate, User};

/// Longest accepted name or address field.
pub const MAX_FIELD_LENGTH: usize = 100;

/// Errors from user operations.
#[derive(Debug, Error)]
pub enum UserError {
    /// A user with this id or email already exists.
    #[error("user already exists")]
    AlreadyExists,

    /// No such user.
    #[error("user not found")]
    NotFound,

    /// No such address for this user.
    #[error("address not found")]
    AddressNotFound,

    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("invalid phone: {0}")]
    InvalidPhone(#[from] PhoneError),

    /// A text field is empty or too long.
    #[error("{field} must be 1-{max} characters", max = MAX_FIELD_LENGTH)]
    InvalidField { field: &'static str },

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Trim a field and check its length.
pub(crate) fn clean_field(value: &str, field: &'static str) -> Result<String, UserError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_FIELD_LENGTH {
        return Err(UserError::InvalidField { field });
    }
    Ok(trimmed.to_owned())
}

/// Like [`clean_field`], but blank means "not set".
fn clean_optional(value: Option<&str>, field: &'static str) -> Result<Option<String>, UserError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => clean_field(v, field).map(Some),
    }
}

/// User service.
#[derive(Clone)]
pub struct UserService {
    pool: SqlitePool,
}

impl UserService {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a user.
    ///
    /// # Errors
    ///
    /// Returns `UserError::AlreadyExists` if the id or email is taken.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn create(&self, user: NewUser) -> Result<User, UserError> {
        let user = NewUser {
            first_name: clean_optional(user.first_name.as_deref(), "first_name")?,
            last_name: clean_optional(user.last_name.as_deref(), "last_name")?,
            ..user
        };

        UserRepository::new(&self.pool)
            .create(&user)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => UserError::AlreadyExists,
                other => UserError::Repository(other),
            })
    }

    /// Look up a user. Repeated calls return the same user.
    ///
    /// # Errors
    ///
    /// Returns `UserError::Repository` on storage failure.
    pub async fn get(&self, id: &UserId) -> Result<Option<User>, UserError> {
        Ok(UserRepository::new(&self.pool).get_by_id(id).await?)
    }

    /// Return the user for an identity, creating it on first sign-in.
    ///
    /// An existing user is returned as stored: local profile edits win over
    /// whatever the identity provider reports later.
    ///
    /// # Errors
    ///
    /// Returns `UserError::AlreadyExists` if a different user already owns
    /// the identity's email.
    #[instrument(skip(self, identity), fields(user_id = %identity.id))]
    pub async fn get_or_create(&self, identity: &Identity) -> Result<User, UserError> {
        if let Some(user) = self.get(&identity.id).await? {
            return Ok(user);
        }

        let new_user = NewUser {
            id: identity.id.clone(),
            email: identity.email.clone(),
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
        };
        match self.create(new_user).await {
            Ok(user) => {
                tracing::info!("Created user on first sign-in");
                Ok(user)
            }
            // Lost a race with a concurrent first sign-in.
            Err(UserError::AlreadyExists) => self
                .get(&identity.id)
                .await?
                .ok_or(UserError::AlreadyExists),
            Err(e) => Err(e),
        }
    }

    /// Apply a profile update.
    ///
    /// # Errors
    ///
    /// Returns `UserError::InvalidField` / `InvalidPhone` on bad input and
    /// `UserError::NotFound` if the user does not exist.
    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, id: &UserId, update: ProfileUpdate) -> Result<User, UserError> {
        let current = self.get(id).await?.ok_or(UserError::NotFound)?;

        let first_name = match update.first_name.as_deref() {
            Some(v) => clean_optional(Some(v), "first_name")?,
            None => current.first_name,
        };
        let last_name = match update.last_name.as_deref() {
            Some(v) => clean_optional(Some(v), "last_name")?,
            None => current.last_name,
        };
        let phone = match update.phone.as_deref().map(str::trim) {
            Some("") => None,
            Some(v) => Some(PhoneNumber::parse(v)?),
            None => current.phone,
        };

        UserRepository::new(&self.pool)
            .update_profile(id, first_name.as_deref(), last_name.as_deref(), phone.as_ref())
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => UserError::NotFound,
                other => UserError::Repository(other),
            })
    }

    /// Saved addresses of a user.
    ///
    /// # Errors
    ///
    /// Returns `UserError::Repository` on storage failure.
    pub async fn list_addresses(&self, user_id: &UserId) -> Result<Vec<DeliveryAddress>, UserError> {
        Ok(AddressRepository::new(&self.pool).list_for_user(user_id).await?)
    }

    /// Save a delivery address.
    ///
    /// # Errors
    ///
    /// Returns `UserError::InvalidField` / `InvalidPhone` on bad input.
    #[instrument(skip(self, address))]
    pub async fn add_address(
        &self,
        user_id: &UserId,
        address: NewAddress,
    ) -> Result<DeliveryAddress, UserError> {
        let recipient = clean_field(&address.recipient_name, "recipient_name")?;
        let phone = PhoneNumber::parse(&address.phone)?;
        let city = clean_field(&address.city, "city")?;
        let line = clean_field(&address.address_line, "address_line")?;
        let postal_code = clean_optional(address.postal_code.as_deref(), "postal_code")?;

        Ok(AddressRepository::new(&self.pool)
            .create(user_id, &recipient, &phone, &city, &line, postal_code.as_deref())
            .await?)
    }

    /// Delete one of the user's addresses.
    ///
    /// # Errors
    ///
    /// Returns `UserError::AddressNotFound` if the address does not exist or
    /// belongs to someone else.
    pub async fn delete_address(&self, user_id: &UserId, id: &AddressId) -> Result<(), UserError> {
        AddressRepository::new(&self.pool)
            .delete(user_id, id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => UserError::AddressNotFound,
                other => UserError::Repository(other),
            })
    }
}
