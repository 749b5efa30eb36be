//! Checkout storage abstraction.
//!
//! Earlier checkout steps (cart, address form, payment selection) leave their
//! results in per-visitor storage. Depending on the code path they may have
//! written to different keys, so readers check several named locations.
//!
//! Values are JSON text, exactly as the checkout steps wrote them. A value
//! that is not valid JSON is a readable entry, just not a usable one.
//!
//! # Implementations
//!
//! - [`SessionStore`] - the visitor's tower-sessions session (production)
//! - [`MemoryStore`] - an in-process map (tests and local tooling)

pub mod keys;
mod memory;
mod resolve;
mod session;

pub use memory::MemoryStore;
pub use resolve::{Resolved, StorageSource, read_text, resolve_first};
pub use session::SessionStore;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors raised by a storage backend.
///
/// Malformed values are not errors; see [`resolve_first`].
#[derive(Debug, Error)]
pub enum StorageError {
    /// The session backend failed.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// A value could not be encoded for writing.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The in-memory store's lock was poisoned by a panicking writer.
    #[error("storage lock poisoned")]
    Poisoned,
}

/// A string key-value store with explicit read, write and delete.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the raw text stored under `key`.
    async fn get_raw(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the text stored under `key`.
    async fn set_raw(&self, key: &str, value: String) -> Result<(), StorageError>;

    /// Delete `key`. Deleting a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Make every write so far visible to other requests.
    ///
    /// Stores that write through need not override this.
    async fn flush(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Read and decode a JSON value, treating malformed text as absent.
///
/// # Errors
///
/// Returns `StorageError` only if the backend itself fails.
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(raw) = store.get_raw(key).await? else {
        return Ok(None);
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::debug!(key, error = %e, "Ignoring malformed storage entry");
            Ok(None)
        }
    }
}

/// Encode `value` as JSON and store it under `key`.
///
/// # Errors
///
/// Returns `StorageError` if encoding or the backend write fails.
pub async fn set_json<T: Serialize + Sync>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value)?;
    store.set_raw(key, raw).await
}
