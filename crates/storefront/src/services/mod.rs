//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `pricing` - Server-side cart validation against the catalog
//! - `identity` - Who is buying: session user, new account, or guest
//! - `orders` - Order writes, listing, and returns
//! - `checkout` - The checkout pipeline tying the above together
//! - `fulfillment` - Order writes for succeeded payments
//! - `auth` - Registration, login, and password changes

pub mod auth;
pub mod checkout;
pub mod fulfillment;
pub mod identity;
pub mod orders;
pub mod pricing;

pub use auth::{AuthError, AuthService};
pub use checkout::{CheckoutError, CheckoutRequest, CheckoutService, PlacedOrder};
pub use fulfillment::{FulfillmentError, FulfillmentOutcome, FulfillmentService};
pub use identity::{IdentityError, IdentityResolver};
pub use orders::{OrderError, OrderWriter};
