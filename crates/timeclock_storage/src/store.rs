//! Key-value store trait definition.

use crate::error::StorageResult;

/// A durable key-value store.
///
/// Stores map string keys to string values. Callers persist JSON documents
/// and use [`crate::get_json`] / [`crate::set_json`] for typed access.
///
/// # Invariants
///
/// - `get` returns exactly the value of the last successful `set`
/// - `delete` of a missing key succeeds
/// - Every operation completes before returning; there is no buffering
///   that a later call could observe out of order
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing
/// - [`super::FileStore`] - For persistent storage
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// Returns `Ok(None)` when the key has never been written or was deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying medium cannot be read.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Writes `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be made durable.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Removes `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying medium cannot be updated.
    fn delete(&self, key: &str) -> StorageResult<()>;

    /// Returns true if a value is stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying medium cannot be read.
    fn contains(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}
