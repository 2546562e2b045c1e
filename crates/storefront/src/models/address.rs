//! Saved delivery addresses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use balance_botanica_core::{AddressId, PhoneNumber, UserId};

/// A delivery contact saved on the customer's profile.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryAddress {
    pub id: AddressId,
    pub user_id: UserId,
    pub recipient_name: String,
    pub phone: PhoneNumber,
    pub city: String,
    /// Street address or carrier branch, free form.
    pub address_line: String,
    pub postal_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request body for saving an address.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAddress {
    pub recipient_name: String,
    pub phone: String,
    pub city: String,
    pub address_line: String,
    #[serde(default)]
    pub postal_code: Option<String>,
}
