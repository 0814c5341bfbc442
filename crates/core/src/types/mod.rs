//! Core types for the AERO-X store.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod address;
pub mod email;
pub mod id;
pub mod order;
pub mod price;
pub mod status;

pub use address::{AddressError, ShippingAddress};
pub use email::{Email, EmailError};
pub use id::*;
pub use order::OrderLine;
pub use price::{CurrencyCode, Price};
pub use status::*;
