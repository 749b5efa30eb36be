//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Health check
//! GET  /health/ready                    - Readiness check (database)
//!
//! # Post-payment
//! GET  /payment/success                 - Payment app return URL (reconciles the order)
//! GET  /order-confirmation/{number}     - Confirmation page from order history
//! GET  /checkout/review                 - Manual order review
//!
//! # Checkout API (JSON)
//! PUT  /api/checkout/cart               - Save cart snapshot
//! PUT  /api/checkout/address            - Save shipping address
//! PUT  /api/checkout/payment            - Save payment method, UTR and amount
//! GET  /api/orders                      - Local order history
//! ```

pub mod api;
pub mod checkout;

use axum::{
    Router,
    routing::{get, put},
};

use crate::state::AppState;

/// Create the checkout API routes router.
pub fn checkout_api_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", put(api::checkout::put_cart))
        .route("/address", put(api::checkout::put_address))
        .route("/payment", put(api::checkout::put_payment))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Post-payment flow
        .route("/payment/success", get(checkout::payment_success))
        .route(
            "/order-confirmation/{order_number}",
            get(checkout::confirmation),
        )
        .route(checkout::REVIEW_PATH, get(checkout::review))
        // JSON API
        .nest("/api/checkout", checkout_api_routes())
        .route("/api/orders", get(api::orders::list))
}
