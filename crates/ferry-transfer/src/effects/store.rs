use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex, PoisonError};

/// Durable key-value slot for checkpoint records.
///
/// The engine only ever touches one key and stores one opaque JSON string
/// under it; implementations need no schema knowledge.
pub trait CheckpointStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn get(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Replace whatever is stored under `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error>;

    /// Remove `key`. Removing a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), Self::Error>;
}

impl<S: CheckpointStore> CheckpointStore for &S {
    type Error = S::Error;

    fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> Result<(), Self::Error> {
        (**self).delete(key)
    }
}

/// Process-local store. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CheckpointStore for MemoryStore {
    type Error = Infallible;

    fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), Self::Error> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_entries() {
        let store = MemoryStore::new();
        let handle = store.clone();
        store.set("next", "{}").unwrap();
        assert_eq!(handle.get("next").unwrap().as_deref(), Some("{}"));
        handle.delete("next").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn set_replaces_wholesale() {
        let store = MemoryStore::new();
        store.set("next", "a").unwrap();
        store.set("next", "b").unwrap();
        assert_eq!(store.get("next").unwrap().as_deref(), Some("b"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn deleting_missing_key_is_fine() {
        let store = MemoryStore::new();
        assert!(store.delete("next").is_ok());
        assert_eq!(store.get("next").unwrap(), None);
    }
}
