//! Locates cart, address and payment data left behind by earlier checkout steps.

use rust_decimal::Decimal;
use serde_json::Value;

use dryfruits_core::{CartItem, PaymentRecord, ShippingAddress, parse_amount};

use crate::storage::{KeyValueStore, StorageError, keys, read_text, resolve_first};

/// Everything the scanner could find. Missing pieces are empty or `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScannedCheckout {
    pub cart: Vec<CartItem>,
    pub cart_source: Option<&'static str>,
    pub address: Option<ShippingAddress>,
    pub address_source: Option<&'static str>,
    pub payment: PaymentRecord,
    pub order_note: Option<String>,
    pub utr: Option<String>,
    pub amount_override: Option<Decimal>,
}

/// Keep the entries that parse as cart items; anything without a product id is dropped.
fn parse_cart(entries: Vec<Value>) -> Vec<CartItem> {
    let mut subtotal = Decimal::ZERO;
    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<CartItem>(entry) {
            Ok(item) if item.product_id.as_str().trim().is_empty() => None,
            Ok(item) if item.price < Decimal::ZERO => {
                tracing::debug!(product_id = %item.product_id, "Dropping cart entry with negative price");
                None
            }
            Ok(item) => match item.line_total().and_then(|line| subtotal.checked_add(line)) {
                Some(sum) => {
                    subtotal = sum;
                    Some(item)
                }
                None => {
                    tracing::debug!(product_id = %item.product_id, "Dropping cart entry that overflows the subtotal");
                    None
                }
            },
            Err(e) => {
                tracing::debug!(error = %e, "Dropping unparseable cart entry");
                None
            }
        })
        .collect()
}

fn address_is_present(address: &ShippingAddress) -> bool {
    address.has_phone()
}

/// Check every storage location and collect what is there.
///
/// # Errors
///
/// Returns `StorageError` only if the storage backend fails.
#[tracing::instrument(skip(store))]
pub async fn scan(store: &dyn KeyValueStore) -> Result<ScannedCheckout, StorageError> {
    let mut scanned = ScannedCheckout::default();

    // Parse each candidate list item-by-item so one bad line doesn't hide the cart.
    for source in keys::CART_SOURCES {
        let found = resolve_first::<Vec<Value>, _>(store, std::slice::from_ref(source), |v| {
            !v.is_empty()
        })
        .await?;
        if let Some(found) = found {
            let items = parse_cart(found.value);
            if !items.is_empty() {
                scanned.cart = items;
                scanned.cart_source = Some(found.source);
                break;
            }
        }
    }

    if let Some(found) = resolve_first(store, keys::ADDRESS_SOURCES, address_is_present).await? {
        scanned.address = Some(found.value);
        scanned.address_source = Some(found.source);
    }

    if let Some(found) =
        resolve_first::<PaymentRecord, _>(store, keys::PAYMENT_SOURCES, |p| !p.is_empty()).await?
    {
        scanned.payment = found.value;
    }

    scanned.order_note = resolve_first::<String, _>(store, keys::ORDER_NOTE_SOURCES, |note| {
        !note.trim().is_empty()
    })
    .await?
    .map(|found| found.value);

    scanned.utr = read_text(store, keys::PAYMENT_UTR).await?;
    scanned.amount_override = read_text(store, keys::PAYMENT_AMOUNT)
        .await?
        .and_then(|raw| parse_amount(&raw));

    tracing::debug!(
        cart_items = scanned.cart.len(),
        cart_source = scanned.cart_source,
        address_source = scanned.address_source,
        has_payment = !scanned.payment.is_empty(),
        has_utr = scanned.utr.is_some(),
        "Checkout storage scanned"
    );

    Ok(scanned)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn test_scan_empty_store() {
        let scanned = scan(&MemoryStore::new()).await.unwrap();
        assert_eq!(scanned, ScannedCheckout::default());
    }

    #[tokio::test]
    async fn test_cart_falls_back_past_unusable_sources() {
        let store = MemoryStore::with_entries([
            (keys::CHECKOUT_CART, "{{broken"),
            (keys::CART, r#"[{"name":"no id","price":10}]"#),
            (
                keys::DRAFT_ORDER,
                r#"{"items":[{"productId":"almonds","price":650,"quantity":1}],"orderNote":"Gift wrap"}"#,
            ),
        ]);

        let scanned = scan(&store).await.unwrap();
        assert_eq!(scanned.cart.len(), 1);
        assert_eq!(scanned.cart[0].product_id.as_str(), "almonds");
        assert_eq!(scanned.cart_source, Some("draft order items"));
        assert_eq!(scanned.order_note.as_deref(), Some("Gift wrap"));
    }

    #[tokio::test]
    async fn test_cart_keeps_valid_lines_of_first_source() {
        let store = MemoryStore::with_entries([(
            keys::CHECKOUT_CART,
            r#"[{"productId":"p1","price":100,"quantity":2},{"price":5},{"productId":"p2","price":"50"}]"#,
        )]);

        let scanned = scan(&store).await.unwrap();
        assert_eq!(scanned.cart.len(), 2);
        assert_eq!(scanned.cart_source, Some("checkout cart"));
    }

    #[tokio::test]
    async fn test_address_from_draft_order() {
        let store = MemoryStore::with_entries([
            (keys::SHIPPING_ADDRESS, "{}"),
            (
                keys::DRAFT_ORDER,
                r#"{"shippingAddress":{"name":"Asha","phone":"9876543210","pincode":"560001"}}"#,
            ),
        ]);

        let scanned = scan(&store).await.unwrap();
        let address = scanned.address.unwrap();
        assert_eq!(address.name, "Asha");
        assert_eq!(scanned.address_source, Some("draft order address"));
    }

    #[tokio::test]
    async fn test_address_without_phone_yields_to_draft_order() {
        let store = MemoryStore::with_entries([
            (keys::SHIPPING_ADDRESS, r#"{"name":"Asha","pincode":"560001"}"#),
            (
                keys::DRAFT_ORDER,
                r#"{"shippingAddress":{"name":"Asha R","phone":"9876543210","pincode":"560001"}}"#,
            ),
        ]);

        let scanned = scan(&store).await.unwrap();
        assert_eq!(scanned.address.unwrap().phone, "9876543210");
        assert_eq!(scanned.address_source, Some("draft order address"));
    }

    #[tokio::test]
    async fn test_cart_drops_overflowing_and_negative_lines() {
        let store = MemoryStore::with_entries([(
            keys::CHECKOUT_CART,
            r#"[{"productId":"p1","price":"70000000000000000000000000000","quantity":2},{"productId":"p2","price":-5},{"productId":"p3","price":650,"quantity":1}]"#,
        )]);

        let scanned = scan(&store).await.unwrap();
        assert_eq!(scanned.cart.len(), 1);
        assert_eq!(scanned.cart[0].product_id.as_str(), "p3");
    }

    #[tokio::test]
    async fn test_cart_drops_line_that_overflows_running_subtotal() {
        let store = MemoryStore::with_entries([(
            keys::CHECKOUT_CART,
            r#"[{"productId":"p1","price":"50000000000000000000000000000"},{"productId":"p2","price":"50000000000000000000000000000"}]"#,
        )]);

        let scanned = scan(&store).await.unwrap();
        assert_eq!(scanned.cart.len(), 1);
        assert_eq!(scanned.cart[0].product_id.as_str(), "p1");
    }

    #[tokio::test]
    async fn test_cart_of_only_overflowing_lines_falls_through() {
        let store = MemoryStore::with_entries([(
            keys::CHECKOUT_CART,
            r#"[{"productId":"p1","price":"70000000000000000000000000000","quantity":2}]"#,
        )]);

        let scanned = scan(&store).await.unwrap();
        assert!(scanned.cart.is_empty());
        assert_eq!(scanned.cart_source, None);
    }

    #[tokio::test]
    async fn test_payment_utr_and_amount() {
        let store = MemoryStore::with_entries([
            (keys::PAYMENT_METHOD, r#"{}"#),
            (keys::DRAFT_PAYMENT, r#"{"method":"upi","upiId":"shop@upi"}"#),
            (keys::PAYMENT_UTR, "412345678901"),
            (keys::PAYMENT_AMOUNT, "\"1299.00\""),
        ]);

        let scanned = scan(&store).await.unwrap();
        assert_eq!(scanned.payment.0["upiId"], "shop@upi");
        assert_eq!(scanned.utr.as_deref(), Some("412345678901"));
        assert_eq!(scanned.amount_override, Some(Decimal::new(1299, 0)));
    }

    #[tokio::test]
    async fn test_unparseable_amount_is_ignored() {
        let store = MemoryStore::with_entries([(keys::PAYMENT_AMOUNT, "lots")]);
        let scanned = scan(&store).await.unwrap();
        assert_eq!(scanned.amount_override, None);
    }
}
