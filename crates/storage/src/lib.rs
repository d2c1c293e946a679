//! Pluggable blob store capability for the hoist upload coordinator.
//!
//! The coordinator talks to durable storage exclusively through the
//! [`BlobStore`] trait; [`from_config`] resolves a configuration into a
//! concrete backend.

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::FilesystemStore;
pub use error::{StorageError, StorageResult};
pub use traits::{BlobReader, BlobStore};

use hoist_core::StorageConfig;
use std::sync::Arc;
use tracing::info;

/// Build a blob store from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn BlobStore>> {
    config.validate().map_err(StorageError::Config)?;

    match config {
        StorageConfig::Filesystem { path } => {
            info!(path = %path.display(), "initializing filesystem blob store");
            let store = FilesystemStore::new(path).await?;
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_config_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig::Filesystem {
            path: dir.path().join("blobs"),
        };
        let store = from_config(&config).await.unwrap();
        assert_eq!(store.backend_name(), "filesystem");
        store.health_check().await.unwrap();
    }
}
