//! Turns whatever the scanner found into one well-formed order submission.
//!
//! Missing data never blocks an order: the payment has already happened, so
//! a placeholder is substituted and the substitution is recorded on the
//! submission (`is_degraded` / `degraded_fields`).

use rust_decimal::Decimal;

use dryfruits_core::{
    CartItem, DegradedField, OrderStatus, OrderSubmission, PaymentMethod, PaymentRecord,
    ProductId, ShippingAddress, TransactionId, cart_subtotal,
};

use super::scanner::ScannedCheckout;

/// Product id of the line item synthesized for a lost cart.
pub const FALLBACK_PRODUCT_ID: &str = "fallback-item";

/// Display name of the synthesized line item.
pub const FALLBACK_PRODUCT_NAME: &str = "Dry Fruits Order";

/// Shipping charged on reconciled orders.
pub const SHIPPING: Decimal = Decimal::ZERO;

/// Address used when checkout storage holds none (or one without a phone).
#[must_use]
pub fn placeholder_address() -> ShippingAddress {
    ShippingAddress {
        name: "Guest Customer".to_string(),
        phone: "0000000000".to_string(),
        email: String::new(),
        address: "Address not provided".to_string(),
        city: "Not provided".to_string(),
        state: "Not provided".to_string(),
        pincode: "000000".to_string(),
        country: "India".to_string(),
    }
}

/// Inputs the scanner does not provide.
#[derive(Debug, Clone)]
pub struct AssemblyInput<'a> {
    pub transaction_id: &'a TransactionId,
    /// Amount reported by the payment step; overrides the cart sum.
    pub amount_override: Option<Decimal>,
    /// Price of the synthetic line item when the cart is empty and no amount is known.
    pub fallback_price: Decimal,
}

fn fallback_item(price: Decimal) -> CartItem {
    CartItem {
        product_id: ProductId::new(FALLBACK_PRODUCT_ID),
        name: FALLBACK_PRODUCT_NAME.to_string(),
        size: None,
        quantity: 1,
        price,
        original_price: None,
        image: None,
    }
}

/// Build the order submission. Always succeeds.
#[must_use]
pub fn assemble(scanned: &ScannedCheckout, input: &AssemblyInput<'_>) -> OrderSubmission {
    let mut degraded = Vec::new();

    let amount_override = input.amount_override.filter(|amount| {
        let usable = *amount > Decimal::ZERO;
        if !usable {
            tracing::warn!(%amount, "Ignoring non-positive payment amount");
        }
        usable
    });

    let (items, cart_sum) = match cart_subtotal(&scanned.cart) {
        Some(sum) if !scanned.cart.is_empty() => (scanned.cart.clone(), sum),
        unusable => {
            let price = amount_override.unwrap_or(input.fallback_price);
            tracing::warn!(
                transaction_id = %input.transaction_id,
                %price,
                overflowed = unusable.is_none(),
                "No usable cart in checkout storage, using a placeholder line item"
            );
            degraded.push(DegradedField::Items);
            (vec![fallback_item(price)], price)
        }
    };

    let shipping_address = match &scanned.address {
        Some(address) if address.has_phone() => address.clone(),
        Some(_) | None => {
            tracing::warn!(
                transaction_id = %input.transaction_id,
                found = scanned.address.is_some(),
                "No usable shipping address, using placeholder"
            );
            degraded.push(DegradedField::ShippingAddress);
            placeholder_address()
        }
    };

    let payment_method = scanned.payment.method().unwrap_or_else(|| {
        degraded.push(DegradedField::PaymentMethod);
        PaymentMethod::default()
    });

    let mut payment_details: PaymentRecord = scanned.payment.clone();
    if let Some(utr) = scanned.utr.as_deref().or_else(|| scanned.payment.utr()) {
        payment_details.insert(PaymentRecord::UTR, utr);
    }
    payment_details.insert(PaymentRecord::TRANSACTION_ID, input.transaction_id.as_str());

    let (subtotal, total) = match amount_override {
        Some(total) => (total.saturating_sub(SHIPPING), total),
        None => (cart_sum, cart_sum.saturating_add(SHIPPING)),
    };

    OrderSubmission {
        items,
        shipping_address,
        payment_method,
        payment_details,
        order_note: scanned.order_note.clone().unwrap_or_default(),
        subtotal,
        shipping: SHIPPING,
        total,
        status: OrderStatus::Pending,
        is_degraded: !degraded.is_empty(),
        degraded_fields: degraded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(txn: &TransactionId, amount: Option<Decimal>) -> AssemblyInput<'_> {
        AssemblyInput {
            transaction_id: txn,
            amount_override: amount,
            fallback_price: Decimal::new(499, 0),
        }
    }

    fn item(id: &str, price: i64, quantity: u32) -> CartItem {
        CartItem {
            product_id: ProductId::new(id),
            name: id.to_string(),
            size: Some("250g".to_string()),
            quantity,
            price: Decimal::new(price, 0),
            original_price: None,
            image: None,
        }
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            name: "Ravi".to_string(),
            phone: "9876543210".to_string(),
            pincode: "110001".to_string(),
            ..ShippingAddress::default()
        }
    }

    #[test]
    fn test_empty_cart_without_override_uses_fallback_price() {
        let txn = TransactionId::new("T0");
        let order = assemble(&ScannedCheckout::default(), &input(&txn, None));

        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].product_id.as_str(), FALLBACK_PRODUCT_ID);
        assert_eq!(order.items[0].price, Decimal::new(499, 0));
        assert_eq!(order.total, Decimal::new(499, 0));
        assert!(order.is_degraded);
        assert!(order.degraded_fields.contains(&DegradedField::Items));
    }

    #[test]
    fn test_empty_cart_with_override_prices_item_at_override() {
        let txn = TransactionId::new("T0");
        let order = assemble(
            &ScannedCheckout::default(),
            &input(&txn, Some(Decimal::new(1299, 0))),
        );
        assert_eq!(order.items[0].price, Decimal::new(1299, 0));
        assert_eq!(order.total, Decimal::new(1299, 0));
    }

    #[test]
    fn test_override_wins_over_cart_sum() {
        let txn = TransactionId::new("T3");
        let scanned = ScannedCheckout {
            cart: vec![item("cashews", 100, 2), item("raisins", 80, 1)],
            address: Some(address()),
            ..ScannedCheckout::default()
        };
        let order = assemble(&scanned, &input(&txn, Some(Decimal::new(250, 0))));

        assert_eq!(order.shipping, Decimal::ZERO);
        assert_eq!(order.subtotal, Decimal::new(250, 0));
        assert_eq!(order.total, Decimal::new(250, 0));
        assert_eq!(order.subtotal, order.total - order.shipping);
    }

    #[test]
    fn test_non_positive_override_is_ignored() {
        let txn = TransactionId::new("T4");
        let scanned = ScannedCheckout {
            cart: vec![item("dates", 300, 1)],
            address: Some(address()),
            ..ScannedCheckout::default()
        };
        let order = assemble(&scanned, &input(&txn, Some(Decimal::ZERO)));
        assert_eq!(order.total, Decimal::new(300, 0));
    }

    #[test]
    fn test_cart_sum_without_override() {
        let txn = TransactionId::new("T1");
        let scanned = ScannedCheckout {
            cart: vec![item("p1", 100, 2)],
            ..ScannedCheckout::default()
        };
        let order = assemble(&scanned, &input(&txn, None));

        assert_eq!(order.subtotal, Decimal::new(200, 0));
        assert_eq!(order.shipping, Decimal::ZERO);
        assert_eq!(order.total, Decimal::new(200, 0));
        assert_eq!(order.shipping_address, placeholder_address());
        assert_eq!(order.degraded_fields, vec![DegradedField::ShippingAddress, DegradedField::PaymentMethod]);
    }

    #[test]
    fn test_overflowing_cart_uses_fallback_item() {
        let txn = TransactionId::new("T7");
        let mut huge = item("saffron", 1, 2);
        huge.price = Decimal::MAX;
        let scanned = ScannedCheckout {
            cart: vec![huge],
            address: Some(address()),
            ..ScannedCheckout::default()
        };
        let order = assemble(&scanned, &input(&txn, None));

        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].product_id.as_str(), FALLBACK_PRODUCT_ID);
        assert_eq!(order.total, Decimal::new(499, 0));
        assert!(order.degraded_fields.contains(&DegradedField::Items));
    }

    #[test]
    fn test_address_without_phone_is_replaced() {
        let txn = TransactionId::new("T5");
        let scanned = ScannedCheckout {
            cart: vec![item("figs", 90, 1)],
            address: Some(ShippingAddress {
                phone: "  ".to_string(),
                ..address()
            }),
            ..ScannedCheckout::default()
        };
        let order = assemble(&scanned, &input(&txn, None));
        assert_eq!(order.shipping_address, placeholder_address());
    }

    #[test]
    fn test_complete_data_is_not_degraded() {
        let txn = TransactionId::new("T6");
        let scanned = ScannedCheckout {
            cart: vec![item("pistachios", 540, 1)],
            address: Some(address()),
            payment: serde_json::from_str(r#"{"method":"upi"}"#).unwrap_or_default(),
            utr: Some("412345678901".to_string()),
            ..ScannedCheckout::default()
        };
        let order = assemble(&scanned, &input(&txn, None));

        assert!(!order.is_degraded);
        assert!(order.degraded_fields.is_empty());
        assert_eq!(order.payment_method, PaymentMethod::Upi);
        assert_eq!(order.payment_details.utr(), Some("412345678901"));
        assert_eq!(order.payment_details.0["transactionId"], "T6");
        assert_eq!(order.status, OrderStatus::Pending);
    }
}
