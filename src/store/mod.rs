pub mod disk;
pub mod memory;

use crate::core::config::AppConfig;
use anyhow::{Context, Result};
pub use disk::FjallStore;
use tracing::debug;

/// Opens the keyspace configured by `data_path`, creating it if missing.
pub fn open_store(config: &AppConfig) -> Result<FjallStore> {
    let path = config.data_path()?;
    debug!(path = %path.display(), "Opening holdings store");
    FjallStore::open(&path)
        .with_context(|| format!("Failed to open holdings store at {}", path.display()))
}
