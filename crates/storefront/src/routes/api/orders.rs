//! Order history endpoint.

use axum::Json;
use tower_sessions::Session;
use tracing::instrument;

use dryfruits_core::LocalOrderRecord;

use crate::checkout::history;
use crate::error::Result;
use crate::storage::SessionStore;

/// The visitor's local order history, newest last.
#[instrument(skip(session))]
pub async fn list(session: Session) -> Result<Json<Vec<LocalOrderRecord>>> {
    let store = SessionStore::new(session);
    Ok(Json(history::load(&store).await?))
}
