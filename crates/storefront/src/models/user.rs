//! User domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use balance_botanica_core::{Email, PhoneNumber, UserId};

/// A storefront customer.
///
/// The id is the one issued by the identity provider, so a customer signing
/// in again always lands on the same row.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Identity provider user id.
    pub id: UserId,
    /// Normalized email address.
    pub email: Email,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// Contact phone.
    pub phone: Option<PhoneNumber>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the profile was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// "First Last", whichever parts are set.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    }
}

/// Data needed to create a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: UserId,
    pub email: Email,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Profile fields a customer may edit. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}
