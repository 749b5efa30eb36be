//! Database connection for the storefront `PostgreSQL`.
//!
//! # Database: `df_storefront`
//!
//! Orders live in the order backend; this database only holds visitor
//! sessions (tower-sessions), which is where checkout storage is kept.
//!
//! ## Tables
//!
//! - `tower_sessions.session` - created by [`crate::middleware::create_session_layer`]

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
