//! Integration tests for the AERO-X storefront API.
//!
//! These run against a live server with a migrated database and are
//! `#[ignore]`d by default.
//!
//! ```bash
//! cargo run -p aerox-cli -- migrate all
//! cargo run -p aerox-storefront &
//! cargo test -p aerox-integration-tests -- --ignored
//! ```
//!
//! Set `STOREFRONT_BASE_URL` to point at a server other than
//! `http://localhost:3001`.

use reqwest::Client;
use serde_json::{Value, json};

/// Base URL for the storefront API.
#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3001".to_string())
}

/// A client that keeps the session cookie between requests.
///
/// # Errors
///
/// Fails if the TLS backend cannot be initialized.
pub fn session_client() -> reqwest::Result<Client> {
    Client::builder().cookie_store(true).build()
}

/// An address that no previous run has registered.
#[must_use]
pub fn unique_email() -> String {
    format!("it-{}@aero-x.test", uuid::Uuid::new_v4().simple())
}

/// A two-product cart shipping to `email`.
#[must_use]
pub fn cart_for(email: &str, password: Option<&str>) -> Value {
    json!({
        "items": [
            {"id": "prod_001", "quantity": 2},
            {"id": "prod_002", "quantity": 1}
        ],
        "shipping_address": {
            "firstName": "Integration",
            "lastName": "Test",
            "email": email,
            "address": "1 Test Street",
            "city": "Lyon",
            "postalCode": "69001"
        },
        "password": password,
    })
}
