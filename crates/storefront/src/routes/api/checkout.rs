//! Checkout step endpoints.
//!
//! Each step writes its result into checkout storage under the primary key
//! the reconciliation scanner reads first.

use axum::{Json, http::StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use dryfruits_core::{
    CartItem, PaymentMethod, PaymentRecord, ShippingAddress, cart_subtotal, price::amount_option,
};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::storage::{SessionStore, keys, set_json};

/// Payment step form data.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentUpdate {
    pub method: PaymentMethod,
    #[serde(default)]
    pub utr: Option<String>,
    #[serde(default, with = "amount_option")]
    pub amount: Option<Decimal>,
}

/// Save the cart snapshot.
#[instrument(skip(session, items), fields(items = items.len()))]
pub async fn put_cart(session: Session, Json(items): Json<Vec<CartItem>>) -> Result<StatusCode> {
    validate_cart(&items)?;

    let store = SessionStore::new(session);
    set_json(&store, keys::CHECKOUT_CART, &items).await?;

    let count = items.len().to_string();
    add_breadcrumb("checkout", "Cart saved", Some(&[("items", count.as_str())]));
    Ok(StatusCode::NO_CONTENT)
}

fn validate_cart(items: &[CartItem]) -> Result<()> {
    if items.iter().any(|item| item.product_id.as_str().trim().is_empty()) {
        return Err(AppError::BadRequest("cart item without product id".to_string()));
    }
    if items.iter().any(|item| item.price < Decimal::ZERO) {
        return Err(AppError::BadRequest("cart item with negative price".to_string()));
    }
    if cart_subtotal(items).is_none() {
        return Err(AppError::BadRequest("cart total is out of range".to_string()));
    }
    Ok(())
}

/// Save the shipping address.
#[instrument(skip(session, address))]
pub async fn put_address(
    session: Session,
    Json(address): Json<ShippingAddress>,
) -> Result<StatusCode> {
    if !address.has_phone() {
        return Err(AppError::BadRequest("phone number is required".to_string()));
    }

    let store = SessionStore::new(session);
    set_json(&store, keys::SHIPPING_ADDRESS, &address).await?;

    add_breadcrumb("checkout", "Shipping address saved", None);
    Ok(StatusCode::NO_CONTENT)
}

/// Save the payment selection, and the UTR and amount when known.
#[instrument(skip(session))]
pub async fn put_payment(
    session: Session,
    Json(update): Json<PaymentUpdate>,
) -> Result<StatusCode> {
    if update.amount.is_some_and(|amount| amount <= Decimal::ZERO) {
        return Err(AppError::BadRequest("amount must be positive".to_string()));
    }

    let store = SessionStore::new(session);

    let mut record = PaymentRecord::default();
    record.insert(PaymentRecord::METHOD, update.method.to_string());
    set_json(&store, keys::PAYMENT_METHOD, &record).await?;

    if let Some(utr) = update.utr.as_deref().map(str::trim).filter(|utr| !utr.is_empty()) {
        set_json(&store, keys::PAYMENT_UTR, &utr).await?;
    }
    if let Some(amount) = update.amount {
        set_json(&store, keys::PAYMENT_AMOUNT, &amount.to_string()).await?;
    }

    let method = update.method.to_string();
    add_breadcrumb("checkout", "Payment method saved", Some(&[("method", method.as_str())]));
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dryfruits_core::ProductId;

    fn item(id: &str, price: Decimal, quantity: u32) -> CartItem {
        CartItem {
            product_id: ProductId::new(id),
            name: String::new(),
            size: None,
            quantity,
            price,
            original_price: None,
            image: None,
        }
    }

    #[test]
    fn test_validate_cart_accepts_ordinary_cart() {
        let items = vec![item("almonds", Decimal::new(499, 0), 2), item("cashews", Decimal::ZERO, 1)];
        assert!(validate_cart(&items).is_ok());
        assert!(validate_cart(&[]).is_ok());
    }

    #[test]
    fn test_validate_cart_rejects_missing_product_id() {
        let items = vec![item("  ", Decimal::new(499, 0), 1)];
        assert!(matches!(validate_cart(&items), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_validate_cart_rejects_negative_price() {
        let items = vec![item("almonds", Decimal::new(-1, 0), 1)];
        assert!(matches!(validate_cart(&items), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_validate_cart_rejects_overflowing_line() {
        let items = vec![item("saffron", Decimal::MAX, 2)];
        assert!(matches!(validate_cart(&items), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_validate_cart_rejects_overflowing_subtotal() {
        let half = Decimal::MAX / Decimal::TWO + Decimal::ONE;
        let items = vec![item("saffron", half, 1), item("pistachio", half, 1)];
        assert!(matches!(validate_cart(&items), Err(AppError::BadRequest(_))));
    }
}
