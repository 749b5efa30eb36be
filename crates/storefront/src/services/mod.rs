//! Clients for services the storefront talks to.
//!
//! # Services
//!
//! - `orders` - Order backend (REST): order creation after payment

pub mod orders;

pub use orders::{CreateOrderOutcome, HttpOrderApi, OrderApi, OrderApiError};
