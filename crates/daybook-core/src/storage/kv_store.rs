use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use thiserror::Error;

/// Errors produced by key-value storage implementations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KvStoreError {
    /// Requested key does not exist.
    #[error("entry not found for key: {key}")]
    NotFound { key: String },
    /// Underlying storage failure.
    #[error("storage failure: {reason}")]
    Storage { reason: String },
}

/// Contract for the local key-value storage backing tasks and sort state.
/// Values are opaque byte blobs; callers own the (de)serialization.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Persist a value under a key, overwriting any existing entry.
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), KvStoreError>;

    /// Retrieve the value for a key.
    async fn get(&self, key: &str) -> Result<Vec<u8>, KvStoreError>;

    /// Remove a key and its value (idempotent).
    async fn delete(&self, key: &str) -> Result<(), KvStoreError>;
}

/// In-memory store for tests and smoke runs.
#[derive(Debug, Default, Clone)]
pub struct InMemoryKvStore {
    inner: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), KvStoreError> {
        let mut map = self.inner.lock().map_err(|err| KvStoreError::Storage {
            reason: format!("lock poisoned: {err}"),
        })?;
        map.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, KvStoreError> {
        let map = self.inner.lock().map_err(|err| KvStoreError::Storage {
            reason: format!("lock poisoned: {err}"),
        })?;
        map.get(key).cloned().ok_or_else(|| KvStoreError::NotFound {
            key: key.to_string(),
        })
    }

    async fn delete(&self, key: &str) -> Result<(), KvStoreError> {
        let mut map = self.inner.lock().map_err(|err| KvStoreError::Storage {
            reason: format!("lock poisoned: {err}"),
        })?;
        map.remove(key);
        Ok(())
    }
}
