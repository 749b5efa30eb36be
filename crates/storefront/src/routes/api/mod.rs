//! JSON API used by the checkout pages.

pub mod checkout;
pub mod orders;
