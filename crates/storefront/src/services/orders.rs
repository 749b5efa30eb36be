//! Order backend client.
//!
//! The backend owns order persistence. The storefront only creates orders:
//!
//! - `POST {base}/orders` with an [`OrderSubmission`] body
//! - `2xx` + `{"success": true, "order": {...}}` - created
//! - `409` + `{"order": {...}}` - an order already exists for this payment

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use dryfruits_core::{CreatedOrder, OrderSubmission};

use crate::config::OrdersApiConfig;

/// Errors that can occur when creating an order.
#[derive(Debug, Error)]
pub enum OrderApiError {
    /// The configured base URL is not a valid URL.
    #[error("invalid orders API base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    /// The request did not complete within the configured timeout.
    #[error("order request timed out after {0:?}")]
    Timeout(Duration),

    /// The backend could not be reached.
    #[error("order backend unreachable: {0}")]
    Unreachable(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// API answered `success: false` or omitted the order.
    #[error("order rejected: {0}")]
    Rejected(String),

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Result of a successful create call.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOrderOutcome {
    /// A new order was created.
    Created(CreatedOrder),
    /// The backend reported a conflict and returned the order it already has.
    Existing(CreatedOrder),
}

impl CreateOrderOutcome {
    #[must_use]
    pub const fn order(&self) -> &CreatedOrder {
        match self {
            Self::Created(order) | Self::Existing(order) => order,
        }
    }
}

/// Creates orders in the order backend.
#[async_trait]
pub trait OrderApi: Send + Sync {
    /// Create an order for the given submission.
    async fn create_order(
        &self,
        submission: &OrderSubmission,
    ) -> Result<CreateOrderOutcome, OrderApiError>;
}

#[derive(Debug, Deserialize)]
struct CreateOrderResponse {
    #[serde(default)]
    success: bool,
    order: Option<CreatedOrder>,
    message: Option<String>,
}

/// [`OrderApi`] over HTTP.
#[derive(Clone)]
pub struct HttpOrderApi {
    client: reqwest::Client,
    orders_url: Url,
    timeout: Duration,
}

impl HttpOrderApi {
    /// Create a new order backend client.
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is invalid or the HTTP client fails to build.
    pub fn new(config: &OrdersApiConfig) -> Result<Self, OrderApiError> {
        let mut headers = HeaderMap::new();

        if let Some(token) = &config.api_token {
            let auth_value = format!("Bearer {}", token.expose_secret());
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value)
                    .map_err(|e| OrderApiError::Parse(format!("Invalid API token format: {e}")))?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            orders_url: orders_url(&config.base_url)?,
            timeout: config.timeout,
        })
    }

    fn classify(&self, error: reqwest::Error) -> OrderApiError {
        if error.is_timeout() {
            OrderApiError::Timeout(self.timeout)
        } else if error.is_connect() {
            OrderApiError::Unreachable(error.to_string())
        } else {
            OrderApiError::Http(error)
        }
    }
}

/// Resolve `orders` against the base URL, treating the base as a directory.
fn orders_url(base_url: &str) -> Result<Url, OrderApiError> {
    let mut base = Url::parse(base_url)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base.join("orders")?)
}

/// Interpret a response body given its status.
fn interpret(status: StatusCode, body: &str) -> Result<CreateOrderOutcome, OrderApiError> {
    if status == StatusCode::CONFLICT {
        let parsed: CreateOrderResponse = serde_json::from_str(body).map_err(|_| {
            OrderApiError::Api {
                status: status.as_u16(),
                message: body.to_string(),
            }
        })?;
        return parsed
            .order
            .map(CreateOrderOutcome::Existing)
            .ok_or_else(|| OrderApiError::Api {
                status: status.as_u16(),
                message: parsed
                    .message
                    .unwrap_or_else(|| "conflict without order".to_string()),
            });
    }

    if !status.is_success() {
        return Err(OrderApiError::Api {
            status: status.as_u16(),
            message: body.to_string(),
        });
    }

    let parsed: CreateOrderResponse =
        serde_json::from_str(body).map_err(|e| OrderApiError::Parse(e.to_string()))?;

    match parsed.order {
        Some(order) if parsed.success => Ok(CreateOrderOutcome::Created(order)),
        _ => Err(OrderApiError::Rejected(
            parsed
                .message
                .unwrap_or_else(|| "no order in response".to_string()),
        )),
    }
}

#[async_trait]
impl OrderApi for HttpOrderApi {
    #[tracing::instrument(skip(self, submission), fields(total = %submission.total))]
    async fn create_order(
        &self,
        submission: &OrderSubmission,
    ) -> Result<CreateOrderOutcome, OrderApiError> {
        let response = self
            .client
            .post(self.orders_url.clone())
            .json(submission)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        let outcome = interpret(status, &body);
        if let Err(e) = &outcome {
            tracing::warn!(status = status.as_u16(), error = %e, "Order creation failed");
        }
        outcome
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_orders_url_handles_trailing_slash() {
        assert_eq!(
            orders_url("https://api.example.in/api").unwrap().as_str(),
            "https://api.example.in/api/orders"
        );
        assert_eq!(
            orders_url("https://api.example.in/api/").unwrap().as_str(),
            "https://api.example.in/api/orders"
        );
        assert!(orders_url("not a url").is_err());
    }

    #[test]
    fn test_interpret_created() {
        let outcome = interpret(
            StatusCode::CREATED,
            r#"{"success":true,"order":{"orderNumber":"DF-1001"}}"#,
        )
        .unwrap();
        assert!(matches!(outcome, CreateOrderOutcome::Created(_)));
        assert_eq!(outcome.order().order_number.as_str(), "DF-1001");
    }

    #[test]
    fn test_interpret_conflict_reuses_order() {
        let outcome = interpret(
            StatusCode::CONFLICT,
            r#"{"success":false,"message":"exists","order":{"orderNumber":"DF-0999"}}"#,
        )
        .unwrap();
        assert_eq!(
            outcome,
            CreateOrderOutcome::Existing(serde_json::from_str(r#"{"orderNumber":"DF-0999"}"#).unwrap())
        );
    }

    #[test]
    fn test_interpret_conflict_without_order_is_error() {
        let err = interpret(StatusCode::CONFLICT, r#"{"message":"duplicate"}"#).unwrap_err();
        assert!(matches!(err, OrderApiError::Api { status: 409, .. }));
    }

    #[test]
    fn test_interpret_success_false_is_rejected() {
        let err = interpret(StatusCode::OK, r#"{"success":false,"message":"bad items"}"#).unwrap_err();
        assert!(matches!(err, OrderApiError::Rejected(msg) if msg == "bad items"));
    }

    #[test]
    fn test_interpret_server_error() {
        let err = interpret(StatusCode::BAD_GATEWAY, "upstream down").unwrap_err();
        assert!(matches!(err, OrderApiError::Api { status: 502, .. }));
    }
}
