//! In-memory key-value store for testing.

use crate::error::StorageResult;
use crate::store::KeyValueStore;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// An in-memory key-value store.
///
/// This store keeps all values in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Sessions that should not leave anything on disk
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use timeclock_storage::{InMemoryStore, KeyValueStore};
///
/// let store = InMemoryStore::new();
/// store.set("authToken", "abc").unwrap();
/// assert_eq!(store.get("authToken").unwrap().as_deref(), Some("abc"));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `entries`.
    ///
    /// Useful for testing restore scenarios.
    #[must_use]
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: RwLock::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Returns a copy of every stored entry.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries.read().clone()
    }

    /// Returns the number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}
