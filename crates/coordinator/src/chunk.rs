//! Chunk staging writes.

use crate::error::{Result, UploadError};
use crate::session::UploadSession;
use hoist_core::{ChunkSubmission, COPY_BUFFER_SIZE};
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::trace;
use uuid::Uuid;

/// Write a chunk's payload into the session's staging directory.
///
/// The payload lands under a temp name and is renamed into place once fully
/// written and synced, so the chunk artifact is either complete or absent.
/// Resubmitting an index replaces the previous artifact atomically.
pub(crate) async fn write_chunk(
    session: &UploadSession,
    submission: &ChunkSubmission,
    cancel: &CancellationToken,
) -> Result<PathBuf> {
    fs::create_dir_all(&session.staging_dir).await?;

    let final_path = session.chunk_path(submission.index);
    let temp_path = session
        .staging_dir
        .join(format!(".tmp.{}", Uuid::new_v4()));

    let write_result: Result<()> = async {
        let mut file = fs::File::create(&temp_path).await?;
        for slice in submission.payload.chunks(COPY_BUFFER_SIZE) {
            if cancel.is_cancelled() {
                return Err(UploadError::Cancelled);
            }
            file.write_all(slice).await?;
        }
        file.sync_all().await?;
        Ok(())
    }
    .await;

    if let Err(e) = write_result {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }
    fs::rename(&temp_path, &final_path).await?;

    trace!(
        upload_id = %session.id,
        index = submission.index,
        bytes = submission.payload.len(),
        "chunk staged"
    );
    Ok(final_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use hoist_core::UploadId;

    fn submission(id: &str, index: u32, payload: &[u8]) -> ChunkSubmission {
        ChunkSubmission {
            upload_id: UploadId::parse(id).unwrap(),
            index,
            total_chunks: None,
            file_name: None,
            content_type: None,
            file_size: None,
            payload: Bytes::copy_from_slice(payload),
        }
    }

    #[tokio::test]
    async fn test_write_chunk_creates_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = crate::session::SessionStore::new(4);
        let id = UploadId::parse("u1").unwrap();
        let (session, _) = store.open_or_get(&id, dir.path()).unwrap();
        let cancel = CancellationToken::new();

        let path = write_chunk(&session, &submission("u1", 1, b"abc"), &cancel)
            .await
            .unwrap();
        assert_eq!(path, session.chunk_path(1));
        assert_eq!(std::fs::read(&path).unwrap(), b"abc");
    }

    #[tokio::test]
    async fn test_resubmission_replaces_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = crate::session::SessionStore::new(4);
        let id = UploadId::parse("u1").unwrap();
        let (session, _) = store.open_or_get(&id, dir.path()).unwrap();
        let cancel = CancellationToken::new();

        write_chunk(&session, &submission("u1", 2, b"first"), &cancel)
            .await
            .unwrap();
        write_chunk(&session, &submission("u1", 2, b"second"), &cancel)
            .await
            .unwrap();
        assert_eq!(std::fs::read(session.chunk_path(2)).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_cancelled_write_leaves_no_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = crate::session::SessionStore::new(4);
        let id = UploadId::parse("u1").unwrap();
        let (session, _) = store.open_or_get(&id, dir.path()).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = write_chunk(&session, &submission("u1", 1, b"abc"), &cancel).await;
        assert!(matches!(result, Err(UploadError::Cancelled)));
        assert!(!session.chunk_path(1).exists());
        let leftovers = std::fs::read_dir(&session.staging_dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .count();
        assert_eq!(leftovers, 0);
    }
}
