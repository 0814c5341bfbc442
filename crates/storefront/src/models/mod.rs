//! Domain models for the storefront.
//!
//! These are validated domain objects, separate from database row types.

pub mod order;
pub mod session;
pub mod user;

pub use order::{NewOrder, Order};
pub use session::{CurrentUser, keys as session_keys};
pub use user::{NewUser, User};
