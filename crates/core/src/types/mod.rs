//! Core types for the dry fruits storefront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod order;
pub mod price;
pub mod status;

pub use id::*;
pub use order::*;
pub use price::{CurrencyCode, Price, line_total, parse_amount};
pub use status::*;
