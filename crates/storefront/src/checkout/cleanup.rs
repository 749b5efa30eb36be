//! Clears checkout storage consumed by a completed order.

use crate::storage::{KeyValueStore, StorageError, keys};

/// Remove every entry an order consumes. The saved shipping address stays.
///
/// # Errors
///
/// Returns `StorageError` if the storage backend fails.
pub async fn clear_consumed(store: &dyn KeyValueStore) -> Result<(), StorageError> {
    for key in keys::CONSUMED_BY_ORDER {
        store.remove(key).await?;
    }
    tracing::debug!(keys = keys::CONSUMED_BY_ORDER.len(), "Checkout storage cleared");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn test_clear_keeps_address_and_history() {
        let store = MemoryStore::with_entries([
            (keys::CART, "[]"),
            (keys::PAYMENT_UTR, "412345678901"),
            (keys::SHIPPING_ADDRESS, r#"{"name":"Asha"}"#),
            (keys::ORDER_HISTORY, "[]"),
        ]);

        clear_consumed(&store).await.unwrap();

        assert!(!store.contains(keys::CART).unwrap());
        assert!(!store.contains(keys::PAYMENT_UTR).unwrap());
        assert!(store.contains(keys::SHIPPING_ADDRESS).unwrap());
        assert!(store.contains(keys::ORDER_HISTORY).unwrap());
    }
}
