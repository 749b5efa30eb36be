//! Persists an assembled order, falling back to a storefront-side record.

use chrono::Utc;
use rand::Rng;
use rand::distr::Alphanumeric;

use dryfruits_core::{LocalOrderRecord, OrderNumber, OrderSource, OrderSubmission, TransactionId};

use crate::services::{CreateOrderOutcome, OrderApi};

/// Prefix of order ids generated in the storefront.
pub const LOCAL_ORDER_PREFIX: &str = "LOCAL-";

/// Generate an id for an order the backend never saw:
/// `LOCAL-<unix millis>-<6 uppercase alphanumerics>`.
#[must_use]
pub fn local_order_id() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();
    format!(
        "{LOCAL_ORDER_PREFIX}{}-{suffix}",
        Utc::now().timestamp_millis()
    )
}

/// Create the order in the backend; never fails.
///
/// A conflict reuses the backend's existing order. Any other failure yields
/// a locally generated record so the customer still gets a confirmation.
#[tracing::instrument(skip(api, submission))]
pub async fn submit(
    api: &dyn OrderApi,
    transaction_id: &TransactionId,
    submission: OrderSubmission,
) -> LocalOrderRecord {
    match api.create_order(&submission).await {
        Ok(CreateOrderOutcome::Created(order)) => {
            tracing::info!(order_number = %order.order_number, "Order created");
            LocalOrderRecord::from_server(
                transaction_id.clone(),
                &order,
                submission,
                OrderSource::Created,
            )
        }
        Ok(CreateOrderOutcome::Existing(order)) => {
            tracing::info!(order_number = %order.order_number, "Order already existed, reusing it");
            LocalOrderRecord::from_server(
                transaction_id.clone(),
                &order,
                submission,
                OrderSource::Existing,
            )
        }
        Err(e) => {
            let id = local_order_id();
            tracing::error!(error = %e, local_id = %id, "Order backend failed, recording order locally");
            crate::error::add_breadcrumb(
                "checkout",
                "Order recorded locally after backend failure",
                Some(&[("local_id", id.as_str()), ("transaction_id", transaction_id.as_str())]),
            );
            LocalOrderRecord {
                order_number: OrderNumber::new(id.clone()),
                id,
                transaction_id: transaction_id.clone(),
                source: OrderSource::LocalFallback,
                created_at: Utc::now(),
                order: submission,
            }
        }
    }
}
