//! Dry Fruits Core - Shared types library.
//!
//! This crate provides common types used across the storefront components:
//! - `storefront` - Public-facing shop and post-payment order reconciliation
//! - `integration-tests` - Scenario tests for the checkout flow
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money helpers, statuses, and the cart/order records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
