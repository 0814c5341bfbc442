//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use aerox_core::{Email, ShippingAddress, UserId};

/// A storefront customer account.
///
/// Carries no password hash. Hashes are read only through the credential
/// lookups on [`crate::db::UserStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "userId")]
    pub id: UserId,
    pub email: Email,
    /// Display name, usually `"{first} {last}"` from the last checkout.
    pub name: Option<String>,
    /// Last shipping address used at checkout or saved on the profile.
    pub shipping_address: Option<ShippingAddress>,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub updated_at: DateTime<Utc>,
}

/// Data for inserting a user row.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    /// Argon2 PHC string, never plaintext.
    pub password_hash: String,
    pub name: Option<String>,
    pub shipping_address: Option<ShippingAddress>,
}

impl NewUser {
    /// Account created from a checkout: name and address come from the
    /// shipping address.
    #[must_use]
    pub fn from_checkout(email: Email, password_hash: String, address: &ShippingAddress) -> Self {
        Self {
            email,
            password_hash,
            name: Some(address.full_name()),
            shipping_address: Some(address.clone()),
        }
    }
}
