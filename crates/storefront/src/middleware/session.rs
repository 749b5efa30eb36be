//! Session middleware configuration.
//!
//! Sets up `PostgreSQL`-backed sessions using tower-sessions. Checkout storage
//! lives inside the session, so the cookie has to survive the round trip
//! through the payment app. The cookie is signed with
//! `STOREFRONT_SESSION_SECRET`.

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use thiserror::Error;
use tower_sessions::cookie::Key;
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "df_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Errors building the session layer.
#[derive(Debug, Error)]
pub enum SessionLayerError {
    /// The session table could not be created.
    #[error("Session store migration failed: {0}")]
    Migrate(#[from] sqlx::Error),

    /// The session secret cannot be used as a cookie signing key.
    #[error("Invalid session signing key: {0}")]
    Key(String),
}

/// Derive the cookie signing key from the session secret.
///
/// # Errors
///
/// Returns `SessionLayerError::Key` if the secret is shorter than 64 bytes.
pub fn session_key(secret: &SecretString) -> Result<Key, SessionLayerError> {
    Key::try_from(secret.expose_secret().as_bytes())
        .map_err(|e| SessionLayerError::Key(e.to_string()))
}

/// Create the session layer with `PostgreSQL` store and signed cookies.
///
/// Creates the session table on first start.
///
/// # Errors
///
/// Returns `SessionLayerError` if the session table cannot be created or the
/// secret is not a usable signing key.
pub async fn create_session_layer(
    pool: &PgPool,
    config: &StorefrontConfig,
) -> Result<SessionManagerLayer<PostgresStore, SignedCookie>, SessionLayerError> {
    let key = session_key(&config.session_secret)?;

    let store = PostgresStore::new(pool.clone());
    store.migrate().await?;

    // Determine if we're in production (HTTPS)
    let is_secure = config.base_url.starts_with("https://");

    // Lax, not Strict: the payment app returns with a top-level cross-site GET
    Ok(SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(key))
}
