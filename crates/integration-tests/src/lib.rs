//! Integration test support for the dry fruits storefront.
//!
//! The reconciliation flow is exercised end to end against an in-memory
//! checkout store and a scripted order backend, so no database or network
//! is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p dryfruits-integration-tests
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use dryfruits_core::{CreatedOrder, OrderNumber, OrderSubmission};
use dryfruits_storefront::checkout::{Reconciler, ReconcilerSettings};
use dryfruits_storefront::services::{CreateOrderOutcome, OrderApi, OrderApiError};

/// How the scripted backend answers every create call.
#[derive(Debug, Clone)]
pub enum Reply {
    /// `201` with a new order.
    Created(&'static str),
    /// `409` with the order the backend already has.
    Existing(&'static str),
    /// Connection refused.
    Unreachable,
}

/// An [`OrderApi`] that answers from a script and records what it was sent.
#[derive(Debug)]
pub struct ScriptedOrderApi {
    reply: Reply,
    delay: Duration,
    calls: AtomicUsize,
    submissions: Mutex<Vec<OrderSubmission>>,
}

impl ScriptedOrderApi {
    #[must_use]
    pub fn new(reply: Reply) -> Arc<Self> {
        Self::with_delay(reply, Duration::ZERO)
    }

    /// Answer after `delay`, to keep a request in flight.
    #[must_use]
    pub fn with_delay(reply: Reply, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply,
            delay,
            calls: AtomicUsize::new(0),
            submissions: Mutex::new(Vec::new()),
        })
    }

    /// Number of create calls received.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every submission received, in order.
    #[must_use]
    pub fn submissions(&self) -> Vec<OrderSubmission> {
        self.submissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn server_order(order_number: &str) -> CreatedOrder {
    CreatedOrder {
        order_number: OrderNumber::new(order_number),
        id: Some(format!("srv-{order_number}")),
        extra: serde_json::Map::new(),
    }
}

#[async_trait]
impl OrderApi for ScriptedOrderApi {
    async fn create_order(
        &self,
        submission: &OrderSubmission,
    ) -> Result<CreateOrderOutcome, OrderApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.submissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(submission.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match self.reply {
            Reply::Created(number) => Ok(CreateOrderOutcome::Created(server_order(number))),
            Reply::Existing(number) => Ok(CreateOrderOutcome::Existing(server_order(number))),
            Reply::Unreachable => Err(OrderApiError::Unreachable(
                "connection refused".to_string(),
            )),
        }
    }
}

/// A reconciler with default settings over the given backend.
#[must_use]
pub fn reconciler(api: &Arc<ScriptedOrderApi>) -> Reconciler {
    let api: Arc<dyn OrderApi> = api.clone();
    Reconciler::new(api, ReconcilerSettings::default())
}
