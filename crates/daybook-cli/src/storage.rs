use std::path::PathBuf;

use crate::config::Config;
use color_eyre::Result;
use daybook_storage::JsonFileStore;
use dirs::data_dir;
use tracing::debug;

/// Resolve the default data directory for Daybook.
pub fn default_data_dir() -> Result<PathBuf> {
    let base = data_dir().ok_or_else(|| color_eyre::eyre::eyre!("no data dir available"))?;
    Ok(base.join("daybook"))
}

/// Build the file-backed store, honoring a config override.
pub fn store_from_config(config: &Config) -> Result<JsonFileStore> {
    let root = match &config.data_dir {
        Some(root) => root.clone(),
        None => default_data_dir()?,
    };
    debug!(?root, "initializing task store");
    Ok(JsonFileStore::new(root))
}

/// Helper for tests to construct a store rooted at a temp dir.
#[cfg(test)]
pub fn test_store(root: impl Into<PathBuf>) -> JsonFileStore {
    JsonFileStore::new(root)
}
