//! The visitor's local order history and the duplicate guard built on it.

use dryfruits_core::{LocalOrderRecord, OrderNumber, TransactionId};

use crate::storage::{KeyValueStore, StorageError, get_json, keys, set_json};

/// Load the order history. Missing or malformed history is empty.
///
/// # Errors
///
/// Returns `StorageError` if the storage backend fails.
pub async fn load(store: &dyn KeyValueStore) -> Result<Vec<LocalOrderRecord>, StorageError> {
    Ok(get_json(store, keys::ORDER_HISTORY).await?.unwrap_or_default())
}

/// Find the recorded order for an external payment event, if any.
///
/// # Errors
///
/// Returns `StorageError` if the storage backend fails.
pub async fn find_by_transaction(
    store: &dyn KeyValueStore,
    transaction_id: &TransactionId,
) -> Result<Option<LocalOrderRecord>, StorageError> {
    Ok(load(store)
        .await?
        .into_iter()
        .find(|record| record.matches_transaction(transaction_id)))
}

/// Find a recorded order by its order number.
///
/// # Errors
///
/// Returns `StorageError` if the storage backend fails.
pub async fn find_by_order_number(
    store: &dyn KeyValueStore,
    order_number: &OrderNumber,
) -> Result<Option<LocalOrderRecord>, StorageError> {
    Ok(load(store)
        .await?
        .into_iter()
        .find(|record| &record.order_number == order_number))
}

/// Append a record unless one with the same id or transaction is already present.
///
/// Returns whether the record was added.
///
/// # Errors
///
/// Returns `StorageError` if the storage backend fails.
pub async fn append(
    store: &dyn KeyValueStore,
    record: &LocalOrderRecord,
) -> Result<bool, StorageError> {
    let mut history = load(store).await?;
    if history
        .iter()
        .any(|existing| existing.id == record.id || existing.matches_transaction(&record.transaction_id))
    {
        return Ok(false);
    }
    history.push(record.clone());
    set_json(store, keys::ORDER_HISTORY, &history).await?;
    Ok(true)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use dryfruits_core::{
        CreatedOrder, OrderSource, OrderStatus, OrderSubmission, PaymentMethod, PaymentRecord,
        ShippingAddress,
    };
    use rust_decimal::Decimal;

    fn record(order_number: &str, transaction_id: &str) -> LocalOrderRecord {
        let server: CreatedOrder =
            serde_json::from_str(&format!(r#"{{"orderNumber":"{order_number}"}}"#)).unwrap();
        let submission = OrderSubmission {
            items: Vec::new(),
            shipping_address: ShippingAddress::default(),
            payment_method: PaymentMethod::Upi,
            payment_details: PaymentRecord::default(),
            order_note: String::new(),
            subtotal: Decimal::new(100, 0),
            shipping: Decimal::ZERO,
            total: Decimal::new(100, 0),
            status: OrderStatus::Pending,
            is_degraded: false,
            degraded_fields: Vec::new(),
        };
        LocalOrderRecord::from_server(
            TransactionId::new(transaction_id),
            &server,
            submission,
            OrderSource::Created,
        )
    }

    #[tokio::test]
    async fn test_append_skips_known_transaction() {
        let store = MemoryStore::new();
        assert!(append(&store, &record("DF-1", "T1")).await.unwrap());
        assert!(!append(&store, &record("DF-2", "T1")).await.unwrap());
        assert!(append(&store, &record("DF-3", "T2")).await.unwrap());

        let history = load(&store).await.unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_lookups() {
        let store = MemoryStore::new();
        append(&store, &record("DF-1", "T1")).await.unwrap();

        let by_txn = find_by_transaction(&store, &TransactionId::new("T1")).await.unwrap();
        assert_eq!(by_txn.map(|r| r.order_number), Some(OrderNumber::new("DF-1")));

        let by_number = find_by_order_number(&store, &OrderNumber::new("DF-1")).await.unwrap();
        assert!(by_number.is_some());
        assert!(find_by_order_number(&store, &OrderNumber::new("DF-9")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_history_is_empty() {
        let store = MemoryStore::with_entries([(keys::ORDER_HISTORY, "not json")]);
        assert!(load(&store).await.unwrap().is_empty());
    }
}
