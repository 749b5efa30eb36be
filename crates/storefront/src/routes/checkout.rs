//! Post-payment and order review pages.
//!
//! The payment app sends the visitor back to `/payment/success`. Everything
//! the page needs is already in the session, so the handler only reconciles
//! and picks a response.

use std::time::Duration;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use tower_sessions::Session;
use tracing::instrument;

use dryfruits_core::{CartItem, LocalOrderRecord, OrderNumber, OrderSource, Price, cart_subtotal};

use crate::checkout::{Navigation, PaymentRedirect, ReconcileOutcome, history, scanner};
use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::storage::SessionStore;

/// Where the failure page sends the visitor.
pub const REVIEW_PATH: &str = "/checkout/review";

/// How often the processing page re-checks.
const PROCESSING_REFRESH_SECS: u64 = 2;

/// Path of the confirmation page for an order.
#[must_use]
pub fn confirmation_path(order_number: &OrderNumber) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(order_number.as_str().as_bytes()).collect();
    format!("/order-confirmation/{encoded}")
}

// =============================================================================
// View Models
// =============================================================================

/// Cart line display data for templates.
#[derive(Clone)]
pub struct LineView {
    pub name: String,
    pub size: Option<String>,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
}

impl From<&CartItem> for LineView {
    fn from(item: &CartItem) -> Self {
        Self {
            name: if item.name.trim().is_empty() {
                item.product_id.to_string()
            } else {
                item.name.clone()
            },
            size: item.size.clone(),
            quantity: item.quantity,
            price: Price::inr(item.price).display(),
            line_price: display_amount(item.line_total()),
        }
    }
}

/// Amounts that overflowed render as a dash.
fn display_amount(amount: Option<Decimal>) -> String {
    amount.map_or_else(|| "-".to_string(), |amount| Price::inr(amount).display())
}

/// Order display data for templates.
#[derive(Clone)]
pub struct OrderView {
    pub order_number: String,
    pub lines: Vec<LineView>,
    pub subtotal: String,
    pub shipping: String,
    pub total: String,
    pub payment_method: String,
    pub ship_to: Vec<String>,
    /// Order was saved only on this device; the shop must confirm it manually.
    pub pending_confirmation: bool,
    pub is_degraded: bool,
}

impl From<&LocalOrderRecord> for OrderView {
    fn from(record: &LocalOrderRecord) -> Self {
        let order = &record.order;
        let address = &order.shipping_address;
        let ship_to = [
            &address.name,
            &address.address,
            &address.city,
            &address.state,
            &address.pincode,
            &address.country,
        ]
        .into_iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .map(ToOwned::to_owned)
        .collect();

        Self {
            order_number: record.order_number.to_string(),
            lines: order.items.iter().map(LineView::from).collect(),
            subtotal: Price::inr(order.subtotal).display(),
            shipping: Price::inr(order.shipping).display(),
            total: Price::inr(order.total).display(),
            payment_method: order.payment_method.to_string(),
            ship_to,
            pending_confirmation: record.source == OrderSource::LocalFallback,
            is_degraded: order.is_degraded,
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Order confirmation page.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/confirmation.html")]
pub struct ConfirmationTemplate {
    pub order: OrderView,
}

/// Shown while another request is still submitting the order.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/processing.html")]
pub struct ProcessingTemplate {
    pub refresh_url: String,
    pub refresh_secs: u64,
}

/// Shown when reconciliation failed; refreshes to order review.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/payment_error.html")]
pub struct PaymentErrorTemplate {
    pub message: String,
    pub review_url: String,
    pub redirect_secs: u64,
}

/// Manual order review page.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/review.html")]
pub struct ReviewTemplate {
    pub lines: Vec<LineView>,
    pub subtotal: String,
    pub has_address: bool,
    pub payment_method: Option<String>,
}

fn processing_url(redirect: &PaymentRedirect) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    if let Some(transaction_id) = redirect.transaction_id() {
        query.append_pair("orderId", transaction_id.as_str());
    }
    if let Some(amount) = redirect.amount {
        query.append_pair("amount", &amount.to_string());
    }
    if let Some(utr) = redirect.utr.as_deref() {
        query.append_pair("utr", utr);
    }
    format!("/payment/success?{}", query.finish())
}

fn seconds(delay: Duration) -> u64 {
    delay.as_secs().max(1)
}

// =============================================================================
// Handlers
// =============================================================================

/// Return URL of the payment app.
///
/// Reconciles the payment, then redirects to the confirmation page the
/// first time and renders it in place on repeat visits.
#[instrument(skip(state, session))]
pub async fn payment_success(
    State(state): State<AppState>,
    session: Session,
    Query(redirect): Query<PaymentRedirect>,
) -> Response {
    let store = SessionStore::new(session);
    let outcome = state.reconciler().reconcile(&store, &redirect).await;
    let navigation = outcome.navigation();

    match outcome {
        ReconcileOutcome::MissingTransaction => Redirect::to("/").into_response(),
        ReconcileOutcome::Completed { order, .. } => match navigation {
            Navigation::Confirmation(order_number) => {
                Redirect::to(&confirmation_path(&order_number)).into_response()
            }
            _ => ConfirmationTemplate {
                order: OrderView::from(order.as_ref()),
            }
            .into_response(),
        },
        ReconcileOutcome::InProgress { .. } => ProcessingTemplate {
            refresh_url: processing_url(&redirect),
            refresh_secs: PROCESSING_REFRESH_SECS,
        }
        .into_response(),
        ReconcileOutcome::Failed { message, .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            PaymentErrorTemplate {
                message,
                review_url: REVIEW_PATH.to_string(),
                redirect_secs: seconds(state.config().checkout.review_redirect_delay),
            },
        )
            .into_response(),
    }
}

/// Confirmation page for an order in the visitor's history.
#[instrument(skip(session))]
pub async fn confirmation(
    session: Session,
    Path(order_number): Path<String>,
) -> Result<ConfirmationTemplate> {
    let store = SessionStore::new(session);
    let order_number = OrderNumber::new(order_number);

    let record = history::find_by_order_number(&store, &order_number)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {order_number}")))?;

    Ok(ConfirmationTemplate {
        order: OrderView::from(&record),
    })
}

/// Manual review of whatever is still in checkout storage.
#[instrument(skip(session))]
pub async fn review(session: Session) -> Result<ReviewTemplate> {
    let store = SessionStore::new(session);
    let scanned = scanner::scan(&store).await?;

    Ok(ReviewTemplate {
        lines: scanned.cart.iter().map(LineView::from).collect(),
        subtotal: display_amount(cart_subtotal(&scanned.cart)),
        has_address: scanned.address.is_some(),
        payment_method: scanned.payment.method().map(|method| method.to_string()),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use dryfruits_core::{
        CreatedOrder, OrderStatus, OrderSubmission, PaymentMethod, PaymentRecord, ProductId,
        ShippingAddress, TransactionId,
    };

    fn record(source: OrderSource) -> LocalOrderRecord {
        let submission = OrderSubmission {
            items: vec![CartItem {
                product_id: ProductId::new("cashews"),
                name: String::new(),
                size: Some("500g".to_string()),
                quantity: 2,
                price: Decimal::new(450, 0),
                original_price: None,
                image: None,
            }],
            shipping_address: ShippingAddress {
                name: "Asha".to_string(),
                city: "Pune".to_string(),
                ..ShippingAddress::default()
            },
            payment_method: PaymentMethod::Upi,
            payment_details: PaymentRecord::default(),
            order_note: String::new(),
            subtotal: Decimal::new(900, 0),
            shipping: Decimal::ZERO,
            total: Decimal::new(900, 0),
            status: OrderStatus::Pending,
            is_degraded: false,
            degraded_fields: Vec::new(),
        };
        let server: CreatedOrder = serde_json::from_str(r#"{"orderNumber":"DF-7"}"#).unwrap();
        LocalOrderRecord::from_server(TransactionId::new("T9"), &server, submission, source)
    }

    #[test]
    fn test_order_view_formats_money_and_address() {
        let view = OrderView::from(&record(OrderSource::Created));
        assert_eq!(view.order_number, "DF-7");
        assert_eq!(view.total, "₹900.00");
        assert_eq!(view.lines[0].name, "cashews");
        assert_eq!(view.lines[0].line_price, "₹900.00");
        assert_eq!(view.ship_to, vec!["Asha".to_string(), "Pune".to_string()]);
        assert!(!view.pending_confirmation);
    }

    #[test]
    fn test_overflowing_line_renders_dash() {
        let item = CartItem {
            product_id: ProductId::new("saffron"),
            name: "Saffron".to_string(),
            size: None,
            quantity: 2,
            price: Decimal::MAX,
            original_price: None,
            image: None,
        };
        assert_eq!(LineView::from(&item).line_price, "-");
        assert_eq!(display_amount(Some(Decimal::new(499, 0))), Price::inr(Decimal::new(499, 0)).display());
    }

    #[test]
    fn test_local_fallback_needs_confirmation() {
        let view = OrderView::from(&record(OrderSource::LocalFallback));
        assert!(view.pending_confirmation);
    }

    #[test]
    fn test_confirmation_path_encodes_order_number() {
        assert_eq!(
            confirmation_path(&OrderNumber::new("DF-1001")),
            "/order-confirmation/DF-1001"
        );
        assert_eq!(
            confirmation_path(&OrderNumber::new("A/B")),
            "/order-confirmation/A%2FB"
        );
    }

    #[test]
    fn test_processing_url_keeps_redirect_params() {
        let redirect: PaymentRedirect =
            serde_json::from_str(r#"{"txnId":"T 1","utr":"4123"}"#).unwrap();
        assert_eq!(processing_url(&redirect), "/payment/success?orderId=T+1&utr=4123");
    }
}
