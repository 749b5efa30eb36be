//! Per-transaction reconciliation state machine.
//!
//! ```text
//! idle ──► submitting ──► done
//!   │          │  ▲         ▲
//!   │          ▼  │         │
//!   │        failed ────────┘
//!   └─────────────────────► done   (order already recorded)
//! ```
//!
//! `done` is terminal. A stale `submitting` may be re-entered. Once the
//! backend has accepted the order, `submitting` and `failed` carry the
//! created record, so finishing the local bookkeeping never posts again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use dryfruits_core::{LocalOrderRecord, TransactionId};

use crate::storage::{KeyValueStore, StorageError, get_json, keys, set_json};

/// Coarse state, used for transition checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Idle,
    Submitting,
    Done,
    Failed,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Submitting => write!(f, "submitting"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl Phase {
    /// Whether the state machine permits moving from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Submitting | Self::Done)
                | (Self::Submitting, Self::Submitting | Self::Done | Self::Failed)
                | (Self::Failed, Self::Submitting | Self::Done)
        )
    }
}

/// A transition the state machine does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid reconciliation transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: Phase,
    pub to: Phase,
}

/// Full reconciliation state, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReconcileState {
    #[default]
    Idle,
    Submitting {
        started_at: DateTime<Utc>,
        /// Set once the order exists; only local bookkeeping remains.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        order: Option<Box<LocalOrderRecord>>,
    },
    Done {
        order: Box<LocalOrderRecord>,
        /// Whether the visitor has been sent to the confirmation page.
        redirected: bool,
    },
    Failed {
        reason: String,
        failed_at: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        order: Option<Box<LocalOrderRecord>>,
    },
}

impl ReconcileState {
    /// A submission starting now.
    #[must_use]
    pub fn submitting(order: Option<Box<LocalOrderRecord>>) -> Self {
        Self::Submitting {
            started_at: Utc::now(),
            order,
        }
    }

    /// The created order whose bookkeeping has not finished, if any.
    #[must_use]
    pub fn pending_order(&self) -> Option<&LocalOrderRecord> {
        match self {
            Self::Submitting { order, .. } | Self::Failed { order, .. } => order.as_deref(),
            Self::Idle | Self::Done { .. } => None,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        match self {
            Self::Idle => Phase::Idle,
            Self::Submitting { .. } => Phase::Submitting,
            Self::Done { .. } => Phase::Done,
            Self::Failed { .. } => Phase::Failed,
        }
    }

    /// Move to `next` if the state machine allows it.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] for a disallowed move; `self` is unchanged.
    pub fn transition(&self, next: Self) -> Result<Self, InvalidTransition> {
        let (from, to) = (self.phase(), next.phase());
        if from.can_transition_to(to) {
            tracing::debug!(%from, %to, "Reconciliation state transition");
            Ok(next)
        } else {
            Err(InvalidTransition { from, to })
        }
    }

    /// A submission in progress that started more than `stale_after` ago.
    #[must_use]
    pub fn is_stale_submission(&self, now: DateTime<Utc>, stale_after: std::time::Duration) -> bool {
        match self {
            Self::Submitting { started_at, .. } => chrono::Duration::from_std(stale_after)
                .is_ok_and(|window| now - *started_at > window),
            _ => false,
        }
    }
}

/// Load the state for a transaction. Missing or unreadable state is `Idle`.
///
/// # Errors
///
/// Returns `StorageError` if the storage backend fails.
pub async fn load(
    store: &dyn KeyValueStore,
    transaction_id: &TransactionId,
) -> Result<ReconcileState, StorageError> {
    Ok(get_json(store, &keys::reconcile_state(transaction_id.as_str()))
        .await?
        .unwrap_or_default())
}

/// Persist the state for a transaction and flush the store, together with
/// every write made before it.
///
/// # Errors
///
/// Returns `StorageError` if encoding, the write or the flush fails.
pub async fn save(
    store: &dyn KeyValueStore,
    transaction_id: &TransactionId,
    state: &ReconcileState,
) -> Result<(), StorageError> {
    set_json(store, &keys::reconcile_state(transaction_id.as_str()), state).await?;
    store.flush().await
}
