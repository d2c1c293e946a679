//! In-memory blob store for exercising the coordinator without disk-backed
//! storage.

use async_trait::async_trait;
use hoist_core::{BlobDescriptor, UploadOptions};
use hoist_storage::{BlobReader, BlobStore, StorageError, StorageResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::io::AsyncReadExt;

/// Blob store backed by a mutex-guarded map, with fault injection for
/// commit-failure paths.
#[derive(Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    fail_uploads: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent upload fail with a backend error.
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn get(&self, full_name: &str) -> Option<Vec<u8>> {
        self.blobs.lock().unwrap().get(full_name).cloned()
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn upload(
        &self,
        reader: BlobReader<'_>,
        options: &UploadOptions,
    ) -> StorageResult<BlobDescriptor> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StorageError::Backend {
                message: "injected upload failure".to_string(),
                code: Some("unavailable".to_string()),
            });
        }

        let mut data = Vec::new();
        reader.read_to_end(&mut data).await?;
        let full_name = options.full_name();
        let length = data.len() as u64;
        self.blobs.lock().unwrap().insert(full_name.clone(), data);

        Ok(BlobDescriptor {
            name: options.file_name.clone(),
            full_name,
            length,
            content_type: options.content_type.clone(),
            last_modified: Some(time::OffsetDateTime::now_utc()),
            metadata: options.metadata.clone(),
        })
    }

    async fn exists(&self, full_name: &str) -> StorageResult<bool> {
        Ok(self.blobs.lock().unwrap().contains_key(full_name))
    }

    async fn delete(&self, full_name: &str) -> StorageResult<()> {
        self.blobs
            .lock()
            .unwrap()
            .remove(full_name)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(full_name.to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
