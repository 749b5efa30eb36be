//! Post-payment checkout: turning a returned payment into exactly one order.
//!
//! # Flow
//!
//! 1. [`scanner`] searches checkout storage for cart, address and payment data
//! 2. [`history`] short-circuits if the transaction already has an order
//! 3. [`assembler`] builds the submission, substituting placeholders for gaps
//! 4. [`submission`] creates the order (or reuses / synthesizes one)
//! 5. [`cleanup`] clears consumed storage
//!
//! [`reconcile::Reconciler`] drives the steps under the [`state`] machine.

pub mod assembler;
pub mod cleanup;
pub mod history;
pub mod reconcile;
pub mod scanner;
pub mod state;
pub mod submission;

pub use reconcile::{
    Navigation, PaymentRedirect, ReconcileError, ReconcileOutcome, Reconciler, ReconcilerSettings,
};
