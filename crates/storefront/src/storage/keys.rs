//! Storage keys written by checkout steps, and the order in which they are read.

use super::StorageSource;

/// Cart saved by the checkout page.
pub const CHECKOUT_CART: &str = "checkout_cart";
/// Cart maintained while browsing.
pub const CART: &str = "cart";
/// Pre-payment order intermediate (items, address, note).
pub const DRAFT_ORDER: &str = "draft_order";
/// Address saved by the address form.
pub const SHIPPING_ADDRESS: &str = "shipping_address";
/// Address saved by the one-page checkout.
pub const CHECKOUT_ADDRESS: &str = "checkout_address";
/// Payment method selection.
pub const PAYMENT_METHOD: &str = "payment_method";
/// Payment selection saved before leaving for the payment app.
pub const DRAFT_PAYMENT: &str = "draft_payment";
/// UPI transaction reference entered by the customer.
pub const PAYMENT_UTR: &str = "payment_utr";
/// Amount actually paid, when the payment step reported one.
pub const PAYMENT_AMOUNT: &str = "payment_amount";
/// Locally accumulated order history.
pub const ORDER_HISTORY: &str = "orders";

/// Prefix of the per-transaction reconciliation state key.
pub const RECONCILE_STATE_PREFIX: &str = "reconcile:";

/// Key holding the reconciliation state for one transaction.
#[must_use]
pub fn reconcile_state(transaction_id: &str) -> String {
    format!("{RECONCILE_STATE_PREFIX}{transaction_id}")
}

pub const CART_SOURCES: &[StorageSource] = &[
    StorageSource::new("checkout cart", CHECKOUT_CART),
    StorageSource::new("cart", CART),
    StorageSource::nested("draft order items", DRAFT_ORDER, "/items"),
];

pub const ADDRESS_SOURCES: &[StorageSource] = &[
    StorageSource::new("shipping address", SHIPPING_ADDRESS),
    StorageSource::new("checkout address", CHECKOUT_ADDRESS),
    StorageSource::nested("draft order address", DRAFT_ORDER, "/shippingAddress"),
];

pub const PAYMENT_SOURCES: &[StorageSource] = &[
    StorageSource::new("payment method", PAYMENT_METHOD),
    StorageSource::new("draft payment", DRAFT_PAYMENT),
];

pub const ORDER_NOTE_SOURCES: &[StorageSource] =
    &[StorageSource::nested("draft order note", DRAFT_ORDER, "/orderNote")];

/// Entries consumed by a completed order. The saved address is kept for next time.
pub const CONSUMED_BY_ORDER: &[&str] = &[
    CHECKOUT_CART,
    CART,
    DRAFT_ORDER,
    PAYMENT_METHOD,
    DRAFT_PAYMENT,
    PAYMENT_UTR,
    PAYMENT_AMOUNT,
];
