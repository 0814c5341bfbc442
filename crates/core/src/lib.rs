//! AERO-X Core - Shared domain types.
//!
//! This crate provides the types passed between the storefront API, the CLI,
//! and the integration tests:
//! - identifiers for users and orders
//! - validated email addresses
//! - decimal prices with minor-unit conversion
//! - order status, order line snapshots, and shipping addresses
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Enable the `postgres` feature to get `sqlx`
//! encode/decode implementations for the identifier and email types.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
