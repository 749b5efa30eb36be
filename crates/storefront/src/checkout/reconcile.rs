//! Post-payment order reconciliation.
//!
//! Runs when the customer comes back from the payment app. Assembles an
//! order from checkout storage, creates it (at most once per transaction),
//! records it in the visitor's history, clears consumed storage and decides
//! where the visitor goes next.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use moka::future::Cache;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;

use dryfruits_core::{LocalOrderRecord, OrderNumber, TransactionId, price::amount_option};

use super::assembler::{AssemblyInput, assemble};
use super::state::{InvalidTransition, ReconcileState};
use super::{cleanup, history, scanner, state, submission};
use crate::config::CheckoutConfig;
use crate::services::OrderApi;
use crate::storage::{KeyValueStore, StorageError};

/// Message shown to the visitor when reconciliation fails outright.
pub const FAILURE_MESSAGE: &str =
    "We received your payment but could not confirm your order yet. Please review your order details.";

/// How long an idle per-transaction lock is kept.
const LOCK_IDLE_TTL: Duration = Duration::from_secs(10 * 60);

/// Query parameters of the payment app's return redirect.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentRedirect {
    #[serde(
        rename = "orderId",
        alias = "txnId",
        alias = "transactionId",
        alias = "order_id",
        default
    )]
    pub transaction_id: Option<String>,
    #[serde(default, with = "amount_option")]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub utr: Option<String>,
}

impl PaymentRedirect {
    /// The external transaction id, if present and non-blank.
    #[must_use]
    pub fn transaction_id(&self) -> Option<TransactionId> {
        self.transaction_id
            .as_deref()
            .and_then(|raw| TransactionId::parse(raw).ok())
    }

    fn utr(&self) -> Option<String> {
        self.utr
            .as_deref()
            .map(str::trim)
            .filter(|utr| !utr.is_empty())
            .map(ToOwned::to_owned)
    }
}

/// Errors that abort a reconciliation.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("checkout storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

/// What happened, and what the visitor should see next.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// The redirect carried no transaction id. Nothing was touched.
    MissingTransaction,
    /// An order exists for this transaction.
    ///
    /// `navigate` is true exactly once per transaction: the first time the
    /// order is known to be complete.
    Completed {
        order: Box<LocalOrderRecord>,
        navigate: bool,
    },
    /// Another request is submitting this transaction right now.
    InProgress { transaction_id: TransactionId },
    /// Reconciliation failed; the visitor should review the order manually.
    Failed {
        transaction_id: TransactionId,
        message: String,
    },
}

/// Where the visitor goes after a reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Home,
    Confirmation(OrderNumber),
    /// Render in place; no redirect.
    Stay,
    /// Show the error, then send the visitor to order review after a delay.
    ReviewAfterDelay,
}

impl ReconcileOutcome {
    #[must_use]
    pub fn navigation(&self) -> Navigation {
        match self {
            Self::MissingTransaction => Navigation::Home,
            Self::Completed {
                order,
                navigate: true,
            } => Navigation::Confirmation(order.order_number.clone()),
            Self::Completed { .. } | Self::InProgress { .. } => Navigation::Stay,
            Self::Failed { .. } => Navigation::ReviewAfterDelay,
        }
    }
}

/// Tunables for [`Reconciler`].
#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    pub fallback_price: Decimal,
    pub submission_stale_after: Duration,
}

impl From<&CheckoutConfig> for ReconcilerSettings {
    fn from(config: &CheckoutConfig) -> Self {
        Self {
            fallback_price: config.fallback_price,
            submission_stale_after: config.submission_stale_after,
        }
    }
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self::from(&CheckoutConfig::default())
    }
}

/// Runs reconciliations. Cheap to clone.
#[derive(Clone)]
pub struct Reconciler {
    inner: Arc<ReconcilerInner>,
}

struct ReconcilerInner {
    api: Arc<dyn OrderApi>,
    settings: ReconcilerSettings,
    locks: Cache<TransactionId, Arc<Mutex<()>>>,
}

impl Reconciler {
    #[must_use]
    pub fn new(api: Arc<dyn OrderApi>, settings: ReconcilerSettings) -> Self {
        let locks = Cache::builder().time_to_idle(LOCK_IDLE_TTL).build();
        Self {
            inner: Arc::new(ReconcilerInner {
                api,
                settings,
                locks,
            }),
        }
    }

    /// Reconcile one payment redirect against the visitor's checkout storage.
    ///
    /// Safe to call repeatedly for the same redirect: requests for the same
    /// transaction are serialized, at most one order creation is attempted,
    /// and only one call reports `navigate: true`.
    #[tracing::instrument(skip(self, store), fields(transaction_id = tracing::field::Empty))]
    pub async fn reconcile(
        &self,
        store: &dyn KeyValueStore,
        redirect: &PaymentRedirect,
    ) -> ReconcileOutcome {
        let Some(transaction_id) = redirect.transaction_id() else {
            tracing::warn!("Payment redirect without a transaction id");
            return ReconcileOutcome::MissingTransaction;
        };
        tracing::Span::current().record("transaction_id", transaction_id.as_str());

        let lock = self
            .inner
            .locks
            .get_with(transaction_id.clone(), async { Arc::new(Mutex::new(())) })
            .await;
        let _guard = lock.lock().await;

        match self.reconcile_locked(store, &transaction_id, redirect).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let event_id = sentry::capture_error(&e);
                tracing::error!(
                    error = %e,
                    sentry_event_id = %event_id,
                    "Payment reconciliation failed"
                );
                ReconcileOutcome::Failed {
                    transaction_id,
                    message: FAILURE_MESSAGE.to_string(),
                }
            }
        }
    }

    async fn reconcile_locked(
        &self,
        store: &dyn KeyValueStore,
        transaction_id: &TransactionId,
        redirect: &PaymentRedirect,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        // First session read happens here, under the lock, so it sees what
        // the previous holder flushed.
        let current = state::load(store, transaction_id).await?;

        match &current {
            ReconcileState::Done { order, redirected } => {
                let navigate = !*redirected;
                if navigate {
                    let updated = ReconcileState::Done {
                        order: order.clone(),
                        redirected: true,
                    };
                    state::save(store, transaction_id, &updated).await?;
                }
                tracing::debug!(navigate, "Transaction already reconciled");
                return Ok(ReconcileOutcome::Completed {
                    order: order.clone(),
                    navigate,
                });
            }
            ReconcileState::Submitting { started_at, .. }
                if !current
                    .is_stale_submission(Utc::now(), self.inner.settings.submission_stale_after) =>
            {
                tracing::info!(%started_at, "Submission already in progress");
                return Ok(ReconcileOutcome::InProgress {
                    transaction_id: transaction_id.clone(),
                });
            }
            _ => {}
        }

        if let Some(existing) = history::find_by_transaction(store, transaction_id).await? {
            tracing::info!(
                order_number = %existing.order_number,
                "Order already recorded for this transaction, skipping creation"
            );
            let done = current.transition(ReconcileState::Done {
                order: Box::new(existing.clone()),
                redirected: true,
            })?;
            cleanup::clear_consumed(store).await?;
            state::save(store, transaction_id, &done).await?;
            return Ok(ReconcileOutcome::Completed {
                order: Box::new(existing),
                navigate: true,
            });
        }

        let (latest, record) = match current.pending_order() {
            Some(order) => {
                tracing::info!(
                    order_number = %order.order_number,
                    "Order already created, finishing local bookkeeping"
                );
                (current.clone(), order.clone())
            }
            None => {
                let submitting = current.transition(ReconcileState::submitting(None))?;
                state::save(store, transaction_id, &submitting).await?;
                match self.create(store, transaction_id, redirect).await {
                    Ok(record) => (submitting, record),
                    Err(e) => {
                        record_failure(store, transaction_id, &submitting, &e, None).await;
                        return Err(e);
                    }
                }
            }
        };

        let order = Box::new(record);
        let created = latest.transition(ReconcileState::submitting(Some(order.clone())))?;
        if let Err(e) = self.finish(store, transaction_id, &created, &order).await {
            record_failure(store, transaction_id, &created, &e, Some(order)).await;
            return Err(e);
        }

        tracing::info!(
            order_number = %order.order_number,
            source = ?order.source,
            degraded = order.order.is_degraded,
            "Payment reconciled"
        );
        Ok(ReconcileOutcome::Completed {
            order,
            navigate: true,
        })
    }

    /// Assemble the order from checkout storage and create it.
    async fn create(
        &self,
        store: &dyn KeyValueStore,
        transaction_id: &TransactionId,
        redirect: &PaymentRedirect,
    ) -> Result<LocalOrderRecord, ReconcileError> {
        let mut scanned = scanner::scan(store).await?;
        if let Some(utr) = redirect.utr() {
            scanned.utr = Some(utr);
        }

        let submission = assemble(
            &scanned,
            &AssemblyInput {
                transaction_id,
                amount_override: redirect.amount.or(scanned.amount_override),
                fallback_price: self.inner.settings.fallback_price,
            },
        );
        if submission.is_degraded {
            tracing::warn!(
                degraded_fields = ?submission.degraded_fields,
                "Submitting order with substituted data"
            );
        }

        Ok(submission::submit(self.inner.api.as_ref(), transaction_id, submission).await)
    }

    /// Record the created order, then append it to history, clear storage
    /// and mark the transaction done.
    async fn finish(
        &self,
        store: &dyn KeyValueStore,
        transaction_id: &TransactionId,
        created: &ReconcileState,
        order: &LocalOrderRecord,
    ) -> Result<(), ReconcileError> {
        state::save(store, transaction_id, created).await?;
        history::append(store, order).await?;
        cleanup::clear_consumed(store).await?;
        let done = created.transition(ReconcileState::Done {
            order: Box::new(order.clone()),
            redirected: true,
        })?;
        state::save(store, transaction_id, &done).await?;
        Ok(())
    }
}

/// Best-effort move to `failed`, keeping any created order for the retry.
async fn record_failure(
    store: &dyn KeyValueStore,
    transaction_id: &TransactionId,
    from: &ReconcileState,
    error: &ReconcileError,
    order: Option<Box<LocalOrderRecord>>,
) {
    let failed = match from.transition(ReconcileState::Failed {
        reason: error.to_string(),
        failed_at: Utc::now(),
        order,
    }) {
        Ok(failed) => failed,
        Err(e) => {
            tracing::warn!(error = %e, "Could not record failed reconciliation");
            return;
        }
    };
    if let Err(save_err) = state::save(store, transaction_id, &failed).await {
        tracing::warn!(error = %save_err, "Could not record failed reconciliation");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn redirect(query: &str) -> PaymentRedirect {
        serde_json::from_str(query).unwrap()
    }

    #[test]
    fn test_redirect_accepts_aliases() {
        for key in ["orderId", "txnId", "transactionId", "order_id"] {
            let parsed = redirect(&format!(r#"{{"{key}":" T1 "}}"#));
            assert_eq!(parsed.transaction_id().unwrap().as_str(), "T1");
        }
    }

    #[test]
    fn test_redirect_blank_id_is_missing() {
        assert!(redirect(r#"{"orderId":"  "}"#).transaction_id().is_none());
        assert!(redirect("{}").transaction_id().is_none());
    }

    #[test]
    fn test_redirect_amount_from_string() {
        let parsed = redirect(r#"{"orderId":"T1","amount":"1299.50"}"#);
        assert_eq!(parsed.amount, Some(Decimal::new(129_950, 2)));
    }

    #[test]
    fn test_navigation_mapping() {
        assert_eq!(ReconcileOutcome::MissingTransaction.navigation(), Navigation::Home);
        let failed = ReconcileOutcome::Failed {
            transaction_id: TransactionId::new("T1"),
            message: FAILURE_MESSAGE.to_string(),
        };
        assert_eq!(failed.navigation(), Navigation::ReviewAfterDelay);
        let in_progress = ReconcileOutcome::InProgress {
            transaction_id: TransactionId::new("T1"),
        };
        assert_eq!(in_progress.navigation(), Navigation::Stay);
    }
}
