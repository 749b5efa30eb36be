//! Cart, address, payment and order records exchanged during checkout.
//!
//! All of these serialize with camelCase keys: they are written to checkout
//! storage by earlier checkout steps and posted to the order backend as-is.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::id::{OrderNumber, ProductId, TransactionId};
use super::price::{amount, amount_option, line_total};
use super::status::{OrderSource, OrderStatus, PaymentMethod};

const fn default_quantity() -> u32 {
    1
}

/// One line of a cart snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(with = "amount")]
    pub price: Decimal,
    #[serde(
        default,
        with = "amount_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub original_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl CartItem {
    /// Unit price times quantity. `None` on overflow.
    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        line_total(self.price, self.quantity)
    }
}

/// Sum of all line totals. `None` if any line or the sum overflows.
#[must_use]
pub fn cart_subtotal(items: &[CartItem]) -> Option<Decimal> {
    items
        .iter()
        .try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.line_total()?))
}

/// Delivery address captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingAddress {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub country: String,
}

impl ShippingAddress {
    /// Whether the address carries a usable phone number.
    #[must_use]
    pub fn has_phone(&self) -> bool {
        !self.phone.trim().is_empty()
    }
}

/// Free-form payment metadata merged from checkout storage.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentRecord(pub Map<String, Value>);

impl PaymentRecord {
    /// Key holding the payment method.
    pub const METHOD: &'static str = "method";
    /// Key holding the UPI transaction reference.
    pub const UTR: &'static str = "utr";
    /// Key holding the external transaction id.
    pub const TRANSACTION_ID: &'static str = "transactionId";

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The payment method, if one was recorded and is non-blank.
    #[must_use]
    pub fn method(&self) -> Option<PaymentMethod> {
        self.0
            .get(Self::METHOD)
            .and_then(Value::as_str)
            .and_then(|raw| raw.parse().ok())
    }

    /// The recorded UTR, if present and non-blank.
    #[must_use]
    pub fn utr(&self) -> Option<&str> {
        self.0
            .get(Self::UTR)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|utr| !utr.is_empty())
    }

    /// Set a string field, replacing any previous value.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(key.to_owned(), Value::String(value.into()));
    }
}

/// Field of an order that was substituted with a default during assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DegradedField {
    Items,
    ShippingAddress,
    PaymentMethod,
}

/// Payload posted to the order backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSubmission {
    pub items: Vec<CartItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub payment_details: PaymentRecord,
    #[serde(default)]
    pub order_note: String,
    #[serde(with = "amount")]
    pub subtotal: Decimal,
    #[serde(with = "amount")]
    pub shipping: Decimal,
    #[serde(with = "amount")]
    pub total: Decimal,
    pub status: OrderStatus,
    /// True when any field above was synthesized instead of read from checkout storage.
    #[serde(default)]
    pub is_degraded: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded_fields: Vec<DegradedField>,
}

/// An order as returned by the order backend.
///
/// Only the order number is interpreted; everything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedOrder {
    pub order_number: OrderNumber,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A storefront-side copy of an order, kept in the visitor's order history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalOrderRecord {
    pub id: String,
    pub order_number: OrderNumber,
    pub transaction_id: TransactionId,
    pub source: OrderSource,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub order: OrderSubmission,
}

impl LocalOrderRecord {
    /// Build a record for an order the backend returned.
    #[must_use]
    pub fn from_server(
        transaction_id: TransactionId,
        server: &CreatedOrder,
        order: OrderSubmission,
        source: OrderSource,
    ) -> Self {
        Self {
            id: server
                .id
                .clone()
                .unwrap_or_else(|| server.order_number.to_string()),
            order_number: server.order_number.clone(),
            transaction_id,
            source,
            created_at: Utc::now(),
            order,
        }
    }

    /// Whether this record belongs to the given external payment event.
    #[must_use]
    pub fn matches_transaction(&self, transaction_id: &TransactionId) -> bool {
        &self.transaction_id == transaction_id || self.id == transaction_id.as_str()
    }
}
