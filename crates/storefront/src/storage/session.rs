//! Session-backed key-value store.

use async_trait::async_trait;
use tower_sessions::Session;

use super::{KeyValueStore, StorageError};

/// A [`KeyValueStore`] over the visitor's session.
///
/// Raw text is stored as a JSON string value inside the session record.
/// The session layer only persists the record once the response is sent;
/// [`KeyValueStore::flush`] saves it immediately so concurrent requests for
/// the same visitor see the writes.
#[derive(Debug, Clone)]
pub struct SessionStore {
    session: Session,
}

impl SessionStore {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }
}

#[async_trait]
impl KeyValueStore for SessionStore {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.session.get::<String>(key).await?)
    }

    async fn set_raw(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.session.insert(key, value).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.session.remove_value(key).await?;
        Ok(())
    }

    async fn flush(&self) -> Result<(), StorageError> {
        self.session.save().await?;
        Ok(())
    }
}
