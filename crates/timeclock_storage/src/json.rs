//! Typed JSON access on top of [`KeyValueStore`].

use crate::error::{StorageError, StorageResult};
use crate::store::KeyValueStore;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Reads and deserializes the JSON document stored under `key`.
///
/// # Errors
///
/// Returns [`StorageError::Corrupted`] if the stored text is not valid JSON
/// for `T`, or any error of the underlying store.
pub fn get_json<T: DeserializeOwned>(
    store: &(impl KeyValueStore + ?Sized),
    key: &str,
) -> StorageResult<Option<T>> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| StorageError::Corrupted {
            key: key.to_string(),
            message: e.to_string(),
        })
}

/// Serializes `value` as JSON and stores it under `key`.
///
/// # Errors
///
/// Returns [`StorageError::Serialization`] if `value` cannot be encoded,
/// or any error of the underlying store.
pub fn set_json<T: Serialize + ?Sized>(
    store: &(impl KeyValueStore + ?Sized),
    key: &str,
    value: &T,
) -> StorageResult<()> {
    let raw = serde_json::to_string(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
    store.set(key, &raw)
}
