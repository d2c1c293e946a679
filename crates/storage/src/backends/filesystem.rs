//! Local filesystem blob store backend.

use crate::error::{StorageError, StorageResult};
use crate::traits::{BlobReader, BlobStore};
use async_trait::async_trait;
use hoist_core::{BlobDescriptor, COPY_BUFFER_SIZE, UploadOptions};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::instrument;
use uuid::Uuid;

/// Local filesystem blob store.
pub struct FilesystemStore {
    root: PathBuf,
}

impl FilesystemStore {
    /// Create a new filesystem store rooted at the given directory.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Get the full path for a key, with path traversal protection.
    ///
    /// Returns an error if the key would escape the storage root.
    fn key_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey("key is empty".to_string()));
        }
        // Reject keys with obvious path traversal attempts (fast path)
        if key.contains("..") || key.starts_with('/') || key.starts_with('\\') {
            return Err(StorageError::InvalidKey(format!(
                "path traversal not allowed: {key}"
            )));
        }

        // Validate all path components are normal (no .., ., root, etc.)
        for component in Path::new(key).components() {
            match component {
                std::path::Component::Normal(_) => {}
                _ => {
                    return Err(StorageError::InvalidKey(format!(
                        "contains unsafe path component: {key}"
                    )));
                }
            }
        }

        Ok(self.root.join(key))
    }

    /// Ensure parent directory exists.
    async fn ensure_parent(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FilesystemStore {
    #[instrument(skip(self, reader), fields(backend = "filesystem", key = %options.full_name()))]
    async fn upload(
        &self,
        reader: BlobReader<'_>,
        options: &UploadOptions,
    ) -> StorageResult<BlobDescriptor> {
        let full_name = options.full_name();
        let path = self.key_path(&full_name)?;
        self.ensure_parent(&path).await?;

        // Write to a temp file with a unique name, fsync, then rename so a
        // partially-transferred blob is never visible under the final name.
        let temp_name = format!(".tmp.{}", Uuid::new_v4());
        let temp_path = path.with_file_name(
            path.file_name()
                .map(|n| format!("{}{}", n.to_string_lossy(), temp_name))
                .unwrap_or_else(|| temp_name.clone()),
        );

        let mut length: u64 = 0;
        let write_result: StorageResult<()> = async {
            let mut file = fs::File::create(&temp_path).await?;
            let mut buf = vec![0u8; COPY_BUFFER_SIZE];
            loop {
                let n = reader.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                file.write_all(&buf[..n]).await?;
                length += n as u64;
            }
            file.sync_all().await?;
            Ok(())
        }
        .await;

        if let Err(e) = write_result {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }
        fs::rename(&temp_path, &path).await?;

        let metadata = fs::metadata(&path).await?;
        Ok(BlobDescriptor {
            name: options.file_name.clone(),
            full_name,
            length,
            content_type: options.content_type.clone(),
            last_modified: metadata.modified().ok().map(|t| t.into()),
            metadata: options.metadata.clone(),
        })
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn exists(&self, full_name: &str) -> StorageResult<bool> {
        let path = self.key_path(full_name)?;
        fs::try_exists(&path).await.map_err(StorageError::Io)
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn delete(&self, full_name: &str) -> StorageResult<()> {
        let path = self.key_path(full_name)?;
        fs::remove_file(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(full_name.to_string())
            } else {
                StorageError::Io(e)
            }
        })?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn health_check(&self) -> StorageResult<()> {
        let metadata = fs::metadata(&self.root).await.map_err(|e| {
            StorageError::Io(std::io::Error::new(
                e.kind(),
                format!("storage root not accessible: {e}"),
            ))
        })?;

        if !metadata.is_dir() {
            return Err(StorageError::Config(format!(
                "storage root is not a directory: {:?}",
                self.root
            )));
        }

        Ok(())
    }
}
