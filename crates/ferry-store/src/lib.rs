//! Durable checkpoint storage on top of sled.
//!
//! Records live under `ferry:checkpoint:<key>` so the database can be shared
//! with other state without collisions.

use std::path::Path;

use ferry_transfer::CheckpointStore;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database Error {0}")]
    Database(#[from] sled::Error),
    #[error("Record under '{0}' is not UTF-8")]
    Encoding(String),
}

pub struct SledStore {
    db: sled::Db,
}

pub struct DbKeys;

impl DbKeys {
    pub const PREFIX: &'static str = "ferry:checkpoint:";

    pub fn checkpoint_key(key: &str) -> Vec<u8> {
        format!("{}{key}", Self::PREFIX).into_bytes()
    }
}

impl SledStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "opening checkpoint store");
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Keys that currently hold a checkpoint.
    pub fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        for entry in self.db.scan_prefix(DbKeys::PREFIX) {
            let (key, _) = entry?;
            let key = String::from_utf8_lossy(&key[DbKeys::PREFIX.len()..]).into_owned();
            keys.push(key);
        }
        Ok(keys)
    }
}

impl CheckpointStore for SledStore {
    type Error = StoreError;

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let Some(data) = self.db.get(DbKeys::checkpoint_key(key))? else {
            return Ok(None);
        };
        String::from_utf8(data.to_vec())
            .map(Some)
            .map_err(|_| StoreError::Encoding(key.to_string()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.db.insert(DbKeys::checkpoint_key(key), value.as_bytes())?;
        // The process may be killed right after suspending.
        self.db.flush()?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.db.remove(DbKeys::checkpoint_key(key))?;
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_set_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledStore::open(dir.path()).unwrap();

        assert_eq!(store.get("next").unwrap(), None);
        store.set("next", r#"{"next_chunk_index":1}"#).unwrap();
        assert_eq!(store.get("next").unwrap().as_deref(), Some(r#"{"next_chunk_index":1}"#));

        store.set("next", "{}").unwrap();
        assert_eq!(store.get("next").unwrap().as_deref(), Some("{}"));

        store.delete("next").unwrap();
        assert_eq!(store.get("next").unwrap(), None);
        store.delete("next").unwrap();
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SledStore::open(dir.path()).unwrap();
            store.set("next", "saved").unwrap();
        }
        let store = SledStore::open(dir.path()).unwrap();
        assert_eq!(store.get("next").unwrap().as_deref(), Some("saved"));
    }

    #[test]
    fn keys_lists_only_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledStore::open(dir.path()).unwrap();
        store.set("next", "a").unwrap();
        store.set("nightly", "b").unwrap();
        store.db.insert("other:thing", "c").unwrap();

        let mut keys = store.keys().unwrap();
        keys.sort();
        assert_eq!(keys, ["next", "nightly"]);
    }
}
