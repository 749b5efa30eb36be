//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::checkout::{Reconciler, ReconcilerSettings};
use crate::config::StorefrontConfig;
use crate::services::{HttpOrderApi, OrderApi, OrderApiError};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    reconciler: Reconciler,
}

impl AppState {
    /// Create a new application state backed by the HTTP order API.
    ///
    /// # Errors
    ///
    /// Returns an error if the order API base URL is invalid or the HTTP
    /// client cannot be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, OrderApiError> {
        let api: Arc<dyn OrderApi> = Arc::new(HttpOrderApi::new(&config.orders_api)?);
        Ok(Self::with_order_api(config, pool, api))
    }

    /// Create application state with a custom order API.
    #[must_use]
    pub fn with_order_api(config: StorefrontConfig, pool: PgPool, api: Arc<dyn OrderApi>) -> Self {
        let reconciler = Reconciler::new(api, ReconcilerSettings::from(&config.checkout));
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                reconciler,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get the post-payment reconciler.
    #[must_use]
    pub fn reconciler(&self) -> &Reconciler {
        &self.inner.reconciler
    }
}
