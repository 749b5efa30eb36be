//! First-present lookup over prioritized storage locations.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{KeyValueStore, StorageError};

/// A named location in checkout storage.
///
/// `pointer` selects a JSON pointer inside the stored document, so a nested
/// value (such as the address inside a draft order) can be checked like a
/// top-level key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageSource {
    pub name: &'static str,
    pub key: &'static str,
    pub pointer: Option<&'static str>,
}

impl StorageSource {
    #[must_use]
    pub const fn new(name: &'static str, key: &'static str) -> Self {
        Self {
            name,
            key,
            pointer: None,
        }
    }

    #[must_use]
    pub const fn nested(name: &'static str, key: &'static str, pointer: &'static str) -> Self {
        Self {
            name,
            key,
            pointer: Some(pointer),
        }
    }

    /// Read and parse this location. `None` for missing, malformed or mistyped values.
    async fn read<T: DeserializeOwned>(
        &self,
        store: &dyn KeyValueStore,
    ) -> Result<Option<T>, StorageError> {
        let Some(raw) = store.get_raw(self.key).await? else {
            return Ok(None);
        };

        let document: Value = match serde_json::from_str(&raw) {
            Ok(document) => document,
            Err(e) => {
                tracing::debug!(source = self.name, key = self.key, error = %e, "Skipping malformed storage entry");
                return Ok(None);
            }
        };

        let value = match self.pointer {
            Some(pointer) => match document.pointer(pointer) {
                Some(inner) => inner.clone(),
                None => return Ok(None),
            },
            None => document,
        };

        if value.is_null() {
            return Ok(None);
        }

        match serde_json::from_value(value) {
            Ok(parsed) => Ok(Some(parsed)),
            Err(e) => {
                tracing::debug!(source = self.name, key = self.key, error = %e, "Skipping storage entry with unexpected shape");
                Ok(None)
            }
        }
    }
}

/// A value found by [`resolve_first`], with the location it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub value: T,
    pub source: &'static str,
}

/// Try `sources` in order and return the first value that parses and
/// satisfies `is_present`.
///
/// # Errors
///
/// Returns `StorageError` only if the backend fails; unusable entries are skipped.
pub async fn resolve_first<T, F>(
    store: &dyn KeyValueStore,
    sources: &[StorageSource],
    is_present: F,
) -> Result<Option<Resolved<T>>, StorageError>
where
    T: DeserializeOwned,
    F: Fn(&T) -> bool,
{
    for source in sources {
        if let Some(value) = source.read::<T>(store).await? {
            if is_present(&value) {
                return Ok(Some(Resolved {
                    value,
                    source: source.name,
                }));
            }
        }
    }
    Ok(None)
}

/// Read a short text value that may have been stored either as a JSON
/// string or as bare text. Blank values are treated as absent.
///
/// # Errors
///
/// Returns `StorageError` only if the backend fails.
pub async fn read_text(store: &dyn KeyValueStore, key: &str) -> Result<Option<String>, StorageError> {
    let Some(raw) = store.get_raw(key).await? else {
        return Ok(None);
    };

    let text = match serde_json::from_str::<Value>(&raw) {
        Ok(Value::String(s)) => s,
        Ok(Value::Number(n)) => n.to_string(),
        Ok(Value::Null) => return Ok(None),
        Ok(_) | Err(_) => raw,
    };

    let trimmed = text.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_owned()))
}
