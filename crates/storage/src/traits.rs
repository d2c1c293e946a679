//! Blob store trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use hoist_core::{BlobDescriptor, UploadOptions};
use tokio::io::AsyncRead;

/// A readable byte source handed to [`BlobStore::upload`].
///
/// The coordinator passes an open file handle; tests pass in-memory cursors.
pub type BlobReader<'a> = &'a mut (dyn AsyncRead + Send + Unpin);

/// Durable blob store abstraction.
///
/// This is the narrow capability the coordinator consumes: store bytes under
/// a name, return a descriptor. Every concrete backend (object store, cloud
/// drive, local filesystem) is equivalent from the coordinator's viewpoint.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Stream the reader's bytes into the blob named by `options` and return
    /// a descriptor for the stored blob.
    ///
    /// The write must be atomic: a partially-transferred blob is never
    /// visible under the final name.
    async fn upload(
        &self,
        reader: BlobReader<'_>,
        options: &UploadOptions,
    ) -> StorageResult<BlobDescriptor>;

    /// Check whether a blob exists under the given full name.
    async fn exists(&self, full_name: &str) -> StorageResult<bool>;

    /// Delete a blob by full name.
    async fn delete(&self, full_name: &str) -> StorageResult<()>;

    /// Static identifier for the backend type, used in logging.
    fn backend_name(&self) -> &'static str;

    /// Verify the backend is reachable and properly configured.
    ///
    /// The default implementation returns Ok(()), suitable for backends that
    /// don't require connectivity verification.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}
