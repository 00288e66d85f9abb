use std::{
    fs::{self, File},
    io::{Read, Write},
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use daybook_core::storage::{KvStore, KvStoreError};
use tempfile::NamedTempFile;
use tracing::instrument;

/// File-backed store implementing the shared `KvStore` contract.
/// Each key maps to one file under the root directory; writes go through a
/// temp file and an atomic rename so a crash never leaves a torn blob.
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(sanitize_key(key))
    }
}

#[async_trait]
impl KvStore for JsonFileStore {
    #[instrument(skip_all, fields(key = %key))]
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), KvStoreError> {
        let path = self.path_for(key);
        write_atomic(&path, value)
    }

    #[instrument(skip_all, fields(key = %key))]
    async fn get(&self, key: &str) -> Result<Vec<u8>, KvStoreError> {
        let path = self.path_for(key);
        let mut file = File::open(&path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                KvStoreError::NotFound {
                    key: key.to_string(),
                }
            } else {
                storage_err(err)
            }
        })?;

        let mut buf = Vec::new();
        file.read_to_end(&mut buf).map_err(storage_err)?;
        Ok(buf)
    }

    #[instrument(skip_all, fields(key = %key))]
    async fn delete(&self, key: &str) -> Result<(), KvStoreError> {
        let path = self.path_for(key);
        match fs::remove_file(path) {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(storage_err(err)),
        }
    }
}

fn write_atomic(path: &Path, value: &[u8]) -> Result<(), KvStoreError> {
    let parent = path.parent().ok_or_else(|| KvStoreError::Storage {
        reason: "invalid storage path".to_string(),
    })?;
    fs::create_dir_all(parent).map_err(storage_err)?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(storage_err)?;
    tmp.write_all(value).map_err(storage_err)?;
    tmp.flush().map_err(storage_err)?;
    tmp.persist(path).map_err(|e| storage_err(e.error))?;
    Ok(())
}

/// Keys may contain characters that are not filename-safe; encode them.
fn sanitize_key(key: &str) -> String {
    URL_SAFE_NO_PAD.encode(key)
}

fn storage_err<E: ToString>(err: E) -> KvStoreError {
    KvStoreError::Storage {
        reason: err.to_string(),
    }
}
